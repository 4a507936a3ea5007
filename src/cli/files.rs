use std::error::Error;

use unicode_width::UnicodeWidthStr;

use crate::api::FileRecord;
use crate::cli::{FilesCommand, Session};
use crate::core::files::{FileStore, SyncStatus};

pub async fn run_files(session: Session, command: &FilesCommand) -> Result<(), Box<dyn Error>> {
    let store = FileStore::new(session.api, session.resolved.context);

    let status = match command {
        FilesCommand::List => store.list_files().await,
        FilesCommand::Delete { file_id } => store.delete_file(file_id).await,
        FilesCommand::Upload { path } => store.upload_file(path).await,
    };

    if status == SyncStatus::Failed {
        let action = match command {
            FilesCommand::List => "list files",
            FilesCommand::Delete { .. } => "delete file",
            FilesCommand::Upload { .. } => "upload file",
        };
        eprintln!("❌ Failed to {action}. Run with POLICYCHAT_LOG=debug for details.");
        std::process::exit(1);
    }

    match command {
        FilesCommand::List => {}
        FilesCommand::Delete { file_id } => println!("✅ Deleted {file_id}\n"),
        FilesCommand::Upload { path } => println!("✅ Uploaded {}\n", path.display()),
    }

    for line in format_file_table(&store.files()) {
        println!("{line}");
    }
    Ok(())
}

/// Renders the listing as aligned columns. Upload dates the server sent in an
/// unrecognized shape are shown verbatim.
pub fn format_file_table(files: &[FileRecord]) -> Vec<String> {
    if files.is_empty() {
        return vec!["No files uploaded.".to_string()];
    }

    let header = ["ID", "FILENAME", "UPLOADED"];
    let rows: Vec<[String; 3]> = files
        .iter()
        .map(|file| {
            let uploaded = file
                .uploaded_at()
                .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| file.upload_date.clone());
            [file.id.clone(), file.filename.clone(), uploaded]
        })
        .collect();

    let mut widths = header.map(|title| title.width());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.width());
        }
    }

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(render_row(header, &widths));
    for [id, filename, uploaded] in &rows {
        lines.push(render_row(
            [id.as_str(), filename.as_str(), uploaded.as_str()],
            &widths,
        ));
    }
    lines
}

fn render_row(cells: [&str; 3], widths: &[usize; 3]) -> String {
    let mut line = String::new();
    for (i, cell) in cells.iter().enumerate() {
        line.push_str(cell);
        if i + 1 < cells.len() {
            line.push_str(&" ".repeat(widths[i] - cell.width() + 2));
        }
    }
    line
}
