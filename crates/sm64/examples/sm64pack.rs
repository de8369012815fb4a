use std::env;
use std::error::Error;
use std::fs;
use std::process;

use common::util::FileSize;

fn main() -> Result<(), Box<dyn Error>> {
    pretty_env_logger::try_init_custom_env("SM64_LOG").unwrap();

    let mut args = env::args_os().skip(1);
    let (in_path, out_path) = match (args.next(), args.next()) {
        (Some(i), Some(o)) => (i, o),
        _ => {
            println!("usage: sm64pack <in.ext.z64> <out.z64>");
            process::exit(0);
        }
    };

    let input = fs::read(&in_path)?;
    match sm64::classify(&input) {
        sm64::RomType::Extended => {}
        other => {
            eprintln!("error: expected an extended rom, got {:?}", other);
            process::exit(1);
        }
    }

    let mut output = vec![0u8; input.len()];
    let config = sm64::Config::default();

    // pack re-bases each block toward its own address rather than
    // compacting the asset region, so the image keeps its input length.
    sm64::pack(&config, &input, &mut output)?;
    sm64::update_checksums(&mut output)?;

    fs::write(&out_path, &output)?;

    println!("packed to {}", FileSize(output.len()));

    Ok(())
}
