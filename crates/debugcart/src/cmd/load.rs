use debugcart_session::{rom_placement, LoadLayout, LoadOptions, SessionConfig};
use tracing::{info, warn};

use crate::cmd::{display_path, open_session, LoadArgs, PortSettings};
use crate::exit::{loader_error, protocol_error, CliResult, HEALTH_CHECK_FAILED, SUCCESS};
use crate::output::{print_report, OutputFormat, TransferReport};

pub fn run(args: LoadArgs, port: &PortSettings, format: OutputFormat) -> CliResult<i32> {
    let (address, layout) = placement(&args);

    let config = SessionConfig {
        verify_writes: args.verify,
        ..SessionConfig::default()
    };
    let mut session = open_session(port, config)?;

    let synced_before = session
        .try_sync()
        .map_err(|err| protocol_error("sync failed", err))?;
    if !synced_before {
        warn!("device did not answer sync before load");
    }

    let options = LoadOptions {
        max_len: args.max_len,
        layout,
    };
    let bytes = session
        .load_file_with(&args.file, address, &options)
        .map_err(|err| loader_error("load failed", err))?;

    let synced_after = session
        .try_sync()
        .map_err(|err| protocol_error("sync failed", err))?;

    print_report(
        &TransferReport {
            operation: "load",
            file: display_path(&args.file),
            start_address: address,
            layout: layout.name(),
            bytes,
            synced_before,
            synced_after,
        },
        format,
    );

    if synced_after {
        Ok(SUCCESS)
    } else {
        Ok(HEALTH_CHECK_FAILED)
    }
}

/// Explicit flags win; whatever is missing comes from the file name.
fn placement(args: &LoadArgs) -> (u32, LoadLayout) {
    match args.address {
        Some(address) => (address, args.layout.map(Into::into).unwrap_or_default()),
        None => {
            let auto = rom_placement(&args.file);
            let layout = args.layout.map(Into::into).unwrap_or(auto.layout);
            info!(
                address = auto.address,
                layout = layout.name(),
                "load address chosen from file name"
            );
            (auto.address, layout)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::cmd::LayoutArg;

    fn args(file: &str, address: Option<u32>, layout: Option<LayoutArg>) -> LoadArgs {
        LoadArgs {
            file: PathBuf::from(file),
            address,
            layout,
            max_len: None,
            verify: false,
        }
    }

    #[test]
    fn explicit_address_defaults_to_linear() {
        let placed = placement(&args("phm3006k.bin", Some(0x6000), None));
        assert_eq!(placed, (0x6000, LoadLayout::Linear));
    }

    #[test]
    fn missing_address_follows_file_name() {
        assert_eq!(
            placement(&args("roms/parsecd.bin", None, None)),
            (0x4_2000, LoadLayout::Linear)
        );
        assert_eq!(
            placement(&args("roms/phm3006k.bin", None, None)),
            (0x1_6000, LoadLayout::GromTight)
        );
    }

    #[test]
    fn explicit_layout_overrides_file_name() {
        let placed = placement(&args("roms/phm3006k.bin", None, Some(LayoutArg::Linear)));
        assert_eq!(placed, (0x1_6000, LoadLayout::Linear));
    }
}
