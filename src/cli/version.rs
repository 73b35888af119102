/// Display version information
pub fn execute() {
    println!("lifeboard {}", env!("CARGO_PKG_VERSION"));
    println!("Operator CLI for the allocation exception council");
}
