// Frame decoding example
use gifload::{Decoder, Frame};
use std::env;
use std::error::Error;
use std::fs;

fn main() -> Result<(), Box<dyn Error>> {
    let path = env::args().nth(1).expect("usage: dec [filename]");
    let data = fs::read(&path)?;
    let count = Decoder::new(&data).decode(&mut |frame: &Frame| {
        println!(
            "frame {}: {}x{} at ({},{}), delay {}, {} colors",
            frame.index,
            frame.head.width(),
            frame.head.height(),
            frame.head.left(),
            frame.head.top(),
            frame.delay_time_cs,
            frame.color_count(),
        );
    });
    println!("count: {count}");
    Ok(())
}
