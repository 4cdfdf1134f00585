fn main() -> Result<(), Box<dyn std::error::Error>> {
    chatmux::cli::main()
}
