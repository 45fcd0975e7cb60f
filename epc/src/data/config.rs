use anyhow::{Result, ensure};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use slog::{Logger, error, info};
use std::fs;
use std::net::Ipv4Addr;

#[derive(Debug, Clone, Deserialize)]
pub struct GnbConfig {
    // Cell served by this gNB.
    pub cell_id: u32,

    // Local S1-U address, on which GTP-U arrives from the SGW.
    pub s1u_addr: Ipv4Addr,

    // The SGW's S1-U address, the destination of all uplink GTP-U.
    pub sgw_s1u_addr: Ipv4Addr,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MmeConfig {
    // Local S11 address.  Also advertised in the MME's F-TEID.
    pub s11_addr: Ipv4Addr,

    // The one and only SGW.
    pub sgw_s11_addr: Ipv4Addr,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct GnbEntry {
    pub cell_id: u32,
    pub addr: Ipv4Addr,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SgwConfig {
    // Local S11 address (GTP-C from the MME).
    pub s11_addr: Ipv4Addr,

    // Local S1-U address (GTP-U from gNBs).
    pub s1u_addr: Ipv4Addr,

    // Local S5 address, used for both GTP-C and GTP-U towards the PGW.
    pub s5_addr: Ipv4Addr,

    // The one and only PGW, for both GTP-C and GTP-U.
    pub pgw_addr: Ipv4Addr,

    // S1-U addresses of the gNBs, keyed by the cell they serve.
    #[serde(default)]
    pub gnbs: Vec<GnbEntry>,
}

impl SgwConfig {
    /// The SGW tells its interfaces apart by local address, so each must be a distinct address
    /// that a peer can send to.
    pub fn validate(&self) -> Result<()> {
        for (name, addr) in [
            ("s11_addr", self.s11_addr),
            ("s1u_addr", self.s1u_addr),
            ("s5_addr", self.s5_addr),
            ("pgw_addr", self.pgw_addr),
        ] {
            ensure!(
                !addr.is_unspecified(),
                "Unspecified IP address 0.0.0.0 not allowed for {name}"
            );
        }
        ensure!(
            self.s1u_addr != self.s5_addr,
            "s1u_addr and s5_addr must differ - both carry GTP-U"
        );
        ensure!(
            self.s11_addr != self.s5_addr,
            "s11_addr and s5_addr must differ - both carry GTP-C"
        );
        for gnb in self.gnbs.iter() {
            ensure!(
                gnb.cell_id != 0,
                "Cell ID 0 is reserved to mean 'no cell' and cannot be configured for a gNB"
            );
            ensure!(
                !gnb.addr.is_unspecified(),
                "Unspecified IP address 0.0.0.0 not allowed for gNB of cell {}",
                gnb.cell_id
            );
        }
        Ok(())
    }
}

/// Load a node configuration file.
pub fn load_config_file<T: DeserializeOwned>(filename: &str, logger: &Logger) -> Result<T> {
    let path = std::env::current_dir()?;
    let contents = fs::read_to_string(filename).inspect_err(|e| {
        error!(
            logger,
            "Failed to load config file {filename} (current directory {}) with error code {e}",
            path.display()
        )
    })?;
    let config = toml::from_str(&contents)?;
    info!(logger, "Loaded configuration from {filename}");
    Ok(config)
}
