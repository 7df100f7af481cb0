use std::io;
use std::net::{IpAddr, Ipv4Addr, UdpSocket};

const PROBE_TARGET: &str = "8.8.8.8:80";

/// Adresse de l'interface que le noyau choisirait pour joindre Internet.
///
/// `connect` sur un socket UDP ne fait que sélectionner la route, rien
/// n'est émis sur le réseau.
fn outbound_address() -> io::Result<IpAddr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
    socket.connect(PROBE_TARGET)?;
    Ok(socket.local_addr()?.ip())
}

/// Adresse IP locale annoncée par le serveur web, `127.0.0.1` sans réseau.
pub fn guess_local_ip() -> String {
    outbound_address()
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guessed_address_is_ipv4() {
        let ip: IpAddr = guess_local_ip().parse().unwrap();
        assert!(ip.is_ipv4());
    }
}
