fn main() -> Result<(), Box<dyn std::error::Error>> {
    policychat::cli::main()
}
