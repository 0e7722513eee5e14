//! Example: List all capture devices
//!
//! Run with: cargo run --example list_devices

use wiretap_capture::list_devices;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let devices = list_devices()?;

    for device in &devices {
        println!("{device}");
        println!();
    }

    println!("{} device(s) found", devices.len());

    Ok(())
}
