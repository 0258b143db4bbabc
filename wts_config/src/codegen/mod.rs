//! Generation of the constants module the firmware includes.
use crate::Configuration;
use anyhow::Result;
use proc_macro2::TokenStream;
use quote::{quote, TokenStreamExt};
use std::{fs::File, io::Write, path::Path};

mod prettify;

/// Name of the generated module, relative to the output directory.
pub const BOARD_MODULE: &str = "wts_rc.rs";

/// Writes the board constants module into `out_dir`.
pub fn generate_modules<P: AsRef<Path>>(
    out_dir: P,
    configuration: &Configuration,
    compiler_version: &str,
) -> Result<()> {
    let path = out_dir.as_ref().join(BOARD_MODULE);
    let mut file = File::create(&path)?;
    file.write_all(board_constants(configuration, compiler_version).to_string().as_bytes())?;
    // rustfmt is optional on the build host.
    prettify::prettify_file(&path).ok();
    Ok(())
}

/// Constants expected by the firmware's board port, which brings
/// `BusConfig`, `ImageLayout`, `Identity`, `Address` and `Milliseconds`
/// into scope before including them.
pub fn board_constants(configuration: &Configuration, compiler_version: &str) -> TokenStream {
    let mut code = TokenStream::new();
    generate_bus_config(configuration, &mut code);
    generate_image_layout(configuration, &mut code);
    generate_identity(configuration, compiler_version, &mut code);
    code
}

fn generate_bus_config(configuration: &Configuration, code: &mut TokenStream) {
    let bus = &configuration.bus;
    let address = bus.address;
    let turnaround_guard = bus.turnaround_guard_ms;
    let byte_gap_timeout = bus.byte_gap_timeout_ms;
    let transmit_hold = bus.transmit_hold_ms;
    let link_timeout = bus.link_timeout_s * 1_000;

    code.append_all(quote! {
        pub const BUS_CONFIG: BusConfig = BusConfig {
            address: #address,
            turnaround_guard: Milliseconds(#turnaround_guard),
            byte_gap_timeout: Milliseconds(#byte_gap_timeout),
            transmit_hold: Milliseconds(#transmit_hold),
            link_timeout: Milliseconds(#link_timeout),
        };
    });
}

fn generate_image_layout(configuration: &Configuration, code: &mut TokenStream) {
    let memory = &configuration.memory;
    let backup = memory.backup_image;
    let primary = memory.primary_image;
    let length = memory.image_length as usize;
    let segment_size = memory.segment_size as usize;
    let program_start = memory.program_start;
    let reset_timeout = memory.reset_timeout_ms;

    code.append_all(quote! {
        pub const IMAGE_LAYOUT: ImageLayout = ImageLayout {
            backup: Address(#backup),
            primary: Address(#primary),
            length: #length,
            segment_size: #segment_size,
            program_start: Address(#program_start),
            reset_timeout: Milliseconds(#reset_timeout),
        };
    });
}

fn generate_identity(configuration: &Configuration, compiler_version: &str, code: &mut TokenStream) {
    let identity = &configuration.identity;
    let software_version = identity.software_version;
    let firmware_id = &identity.firmware_id;
    let target_device = &identity.target_device;

    code.append_all(quote! {
        pub const IDENTITY: Identity = Identity {
            software_version: #software_version,
            firmware_id: #firmware_id,
            compiler_version: #compiler_version,
            target_device: #target_device,
        };
    });
}
