use std::env;
use std::error::Error;
use std::fs;
use std::process;

use common::util::FileSize;

/// Extra space reserved past the input size for the extension region.
const EXTENSION_CAPACITY: usize = 0x40_0000;

fn main() -> Result<(), Box<dyn Error>> {
    pretty_env_logger::try_init_custom_env("SM64_LOG").unwrap();

    let mut args = env::args_os().skip(1);
    let (in_path, out_path) = match (args.next(), args.next()) {
        (Some(i), Some(o)) => (i, o),
        _ => {
            println!("usage: sm64extend <in.z64> <out.z64>");
            process::exit(0);
        }
    };

    let input = fs::read(&in_path)?;
    match sm64::classify(&input) {
        sm64::RomType::BigEndian => {}
        other => {
            eprintln!("error: expected an unextended big-endian rom, got {:?}", other);
            process::exit(1);
        }
    }

    let mut output = vec![0u8; input.len() + EXTENSION_CAPACITY];
    let config = sm64::Config::default();

    let report = sm64::extend(&config, &input, &mut output)?;
    sm64::update_checksums(&mut output)?;

    fs::write(&out_path, &output)?;

    println!(
        "placed {} block(s), skipped {} ({})",
        report.placed,
        report.skipped,
        FileSize(output.len())
    );

    Ok(())
}
