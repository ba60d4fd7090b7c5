// Frame counting example
use gifload::Decoder;
use std::env;
use std::error::Error;
use std::fs;

fn main() -> Result<(), Box<dyn Error>> {
    let path = env::args().nth(1).expect("usage: count [filename]");
    let data = fs::read(&path)?;
    println!("{}: {} frames", path, Decoder::new(&data).count_frames());
    Ok(())
}
