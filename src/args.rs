use std::net::{AddrParseError, IpAddr, SocketAddr};

use clap::Parser;

#[derive(Parser, Debug)]
pub struct Args {
    /// Whether clients reach trailhead over https. When set, the
    /// session cookie is only ever sent on secure connections.
    #[arg(short, long)]
    secure: bool,

    /// The address to listen on, the IPv4 loopback by default.
    #[arg(short, long)]
    address: Option<String>,

    /// The port to listen on.
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    port: u16,
}

impl Args {
    pub fn addr(&self) -> Result<SocketAddr, AddrParseError> {
        let ip: IpAddr = self.address.as_deref().unwrap_or("127.0.0.1").parse()?;
        Ok(SocketAddr::new(ip, self.port))
    }

    pub fn secure(&self) -> bool {
        self.secure
    }
}
