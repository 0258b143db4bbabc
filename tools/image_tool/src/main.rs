mod decorating;
use crate::decorating::*;

mod error;
use crate::error::Error;

extern crate clap;
use clap::clap_app;

use std::{fs, process};

const DEFAULT_IMAGE_LENGTH: usize = 0x2000;

fn parse_length(text: &str) -> Option<usize> {
    match text.strip_prefix("0x") {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}

fn run_decorate(filename: &str, output: &str, length: usize) -> Result<String, Error> {
    let mut image = fs::read(filename).map_err(|_| Error::FileReadFailed)?;
    let firmware_size = image.len();
    let crc = decorate(&mut image, length)?;
    fs::write(output, &image).map_err(|_| Error::FileWriteFailed)?;
    Ok(format!(
        "Padded {} bytes of firmware to {} bytes, checksum 0x{:04x}, written to {}.",
        firmware_size, length, crc, output
    ))
}

fn run_verify(filename: &str, length: usize) -> Result<String, Error> {
    let image = fs::read(filename).map_err(|_| Error::FileReadFailed)?;
    let crc = verify(&image, length)?;
    Ok(format!("{} is a valid image, checksum 0x{:04x}.", filename, crc))
}

fn main() {
    let matches = clap_app!(app =>
        (name: env!("CARGO_PKG_NAME"))
        (version: env!("CARGO_PKG_VERSION"))
        (about: env!("CARGO_PKG_DESCRIPTION"))
        (@arg image: +required "The raw firmware image.")
        (@arg output: -o --output +takes_value "Where to write the decorated image (defaults to in place).")
        (@arg length: -l --length +takes_value "Image length in bytes, decimal or 0x-prefixed (defaults to 0x2000).")
        (@arg verify: --verify "Only check an already decorated image.")
    )
    .get_matches();

    let image = matches.value_of("image").unwrap_or_default();
    let output = matches.value_of("output").unwrap_or(image);
    let length = match matches.value_of("length").map(parse_length) {
        None => DEFAULT_IMAGE_LENGTH,
        Some(Some(length)) => length,
        Some(None) => {
            eprintln!("Image length must be a number.");
            process::exit(1);
        }
    };

    let result = if matches.is_present("verify") {
        run_verify(image, length)
    } else {
        run_decorate(image, output, length)
    };

    match result {
        Ok(s) => println!("{}", s),
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    }
}
