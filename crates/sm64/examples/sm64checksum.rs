use std::env;
use std::error::Error;
use std::fs;
use std::process;

fn main() -> Result<(), Box<dyn Error>> {
    pretty_env_logger::try_init_custom_env("SM64_LOG").unwrap();

    let file = match env::args_os().nth(1) {
        Some(file) => file,
        None => {
            println!("usage: sm64checksum <rom>");
            process::exit(0);
        }
    };

    let rom = fs::read(&file)?;

    println!("rom type: {:?}", sm64::classify(&rom));

    let (crc1, crc2) = sm64::compute_checksums(&rom)?;
    println!("CRC1: {:#010X}", crc1);
    println!("CRC2: {:#010X}", crc2);

    let stored1 = u32::from_be_bytes(rom[0x10..0x14].try_into()?);
    let stored2 = u32::from_be_bytes(rom[0x14..0x18].try_into()?);
    println!(
        "stored CRC1: {:#010X} ({})",
        stored1,
        if stored1 == crc1 { "OK" } else { "INVALID" }
    );
    println!(
        "stored CRC2: {:#010X} ({})",
        stored2,
        if stored2 == crc2 { "OK" } else { "INVALID" }
    );

    Ok(())
}
