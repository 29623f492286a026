//! Repair boxed regions of a single image with the built-in inpainter.
//!
//! Usage:
//! ```sh
//! cargo run --example repair_image -- input.jpg output.png '[[100,100,150,130]]'
//! ```

use std::env;
use std::process;

use watermark_inpaint::{parse_boxes, FastMarchInpainter, RepairEngine};

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 4 {
        eprintln!("Usage: {} <input> <output> <boxes-json>", args[0]);
        process::exit(1);
    }

    let input = &args[1];
    let output = &args[2];
    let boxes = parse_boxes(&args[3]).expect("boxes must be a JSON array of arrays");

    let engine = RepairEngine::with_defaults(FastMarchInpainter::default());
    let result = engine.process_file(input.as_ref(), output.as_ref(), &boxes);

    if result.skipped {
        println!("Skipped: {}", result.message);
    } else if result.success {
        println!("Done: {}", result.message);
    } else {
        eprintln!("Error: {}", result.message);
        process::exit(1);
    }
}
