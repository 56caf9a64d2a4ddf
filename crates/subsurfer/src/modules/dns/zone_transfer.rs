use crate::dns::{trim_name, DnsResolver};
use crate::model::Domain;
use crate::modules::subdomains::SubdomainModule;
use crate::modules::{Module, ModuleKind};
use crate::{Error, Result};
use async_trait::async_trait;
use hickory_resolver::proto::op::{Message, MessageType, OpCode, Query, ResponseCode};
use hickory_resolver::proto::rr::{Name, RecordType};
use std::collections::HashSet;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, instrument, trace};

const AXFR_QUERY_ID: u16 = 0x5a7e;

// region:        --- Module info

pub struct ZoneTransfer {
    dns_resolver: DnsResolver,
    timeout: Duration,
}

impl ZoneTransfer {
    pub fn new(dns_resolver: DnsResolver, timeout: Duration) -> Self {
        Self {
            dns_resolver,
            timeout,
        }
    }

    async fn nameserver_addresses(&self, domain: &Domain) -> Result<Vec<(String, IpAddr)>> {
        let ns_lookup = self.dns_resolver.ns_lookup(domain.as_str()).await?;

        let mut addresses = Vec::new();
        for ns in ns_lookup.iter() {
            let nameserver = trim_name(&ns.to_string());
            match self.dns_resolver.lookup_ip(nameserver.as_str()).await {
                Ok(lookup_ip) => addresses.extend(lookup_ip.iter().map(|ip| (nameserver.clone(), ip))),
                Err(err) => debug!("Resolving nameserver {}: {}", nameserver, err),
            }
        }

        Ok(addresses)
    }
}

/// Owner names of every record of the zone, or an empty list when the
/// server refuses. A transfer cut short keeps the names already received.
#[instrument(name = "axfr", level = "debug", fields(nameserver = %nameserver), skip_all)]
async fn transfer(nameserver: SocketAddr, zone: &Name, wait: Duration) -> Result<Vec<String>> {
    let mut stream = timeout(wait, TcpStream::connect(nameserver))
        .await
        .map_err(|_| Error::Timeout(format!("connect {}", nameserver)))??;

    let query = axfr_query(zone)?;
    let length =
        u16::try_from(query.len()).map_err(|_| Error::InvalidDomain(zone.to_string()))?;
    stream.write_all(&length.to_be_bytes()).await?;
    stream.write_all(&query).await?;

    let mut names = Vec::new();
    let mut soa_count = 0;
    loop {
        let response = match read_message(&mut stream, nameserver, wait).await {
            Ok(Some(response)) => response,
            Ok(None) => break,
            Err(err) if names.is_empty() => return Err(err),
            Err(err) => {
                debug!("Transfer cut short, keeping {} names: {}", names.len(), err);
                break;
            }
        };

        if response.response_code() != ResponseCode::NoError {
            debug!("Refused with {}", response.response_code());
            return Ok(Vec::new());
        }
        if response.answers().is_empty() {
            break;
        }

        for record in response.answers() {
            if record.record_type() == RecordType::SOA {
                soa_count += 1;
            }
            names.push(trim_name(&record.name().to_utf8()));
        }

        // the zone is framed by its SOA record
        if soa_count >= 2 {
            break;
        }
    }

    Ok(names)
}

/// Next length-prefixed message, `None` once the server closes the stream or
/// stays silent.
async fn read_message(
    stream: &mut TcpStream,
    nameserver: SocketAddr,
    wait: Duration,
) -> Result<Option<Message>> {
    let mut length = [0u8; 2];
    match timeout(wait, stream.read_exact(&mut length)).await {
        Ok(Ok(_)) => {}
        _ => return Ok(None),
    }

    let mut buffer = vec![0u8; u16::from_be_bytes(length) as usize];
    timeout(wait, stream.read_exact(&mut buffer))
        .await
        .map_err(|_| Error::Timeout(format!("read {}", nameserver)))??;

    Ok(Some(Message::from_vec(&buffer)?))
}

fn axfr_query(zone: &Name) -> Result<Vec<u8>> {
    let mut message = Message::new();
    message
        .set_id(AXFR_QUERY_ID)
        .set_message_type(MessageType::Query)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(false)
        .add_query(Query::query(zone.clone(), RecordType::AXFR));

    Ok(message.to_vec()?)
}

impl Module for ZoneTransfer {
    fn name(&self) -> String {
        "dns/zone_transfer".to_string()
    }

    fn description(&self) -> String {
        "Attempt an AXFR zone transfer on every nameserver".to_string()
    }
}

// endregion:     --- Module info

#[async_trait]
impl SubdomainModule for ZoneTransfer {
    fn kind(&self) -> ModuleKind {
        ModuleKind::Active
    }

    #[instrument(name = "enumerate", level = "debug", fields(module = %self.name()), skip_all)]
    async fn enumerate(&self, domain: &Domain) -> Result<Vec<String>> {
        let zone = Name::from_ascii(format!("{}.", domain))?;
        let nameservers = self.nameserver_addresses(domain).await?;

        let mut names = HashSet::new();
        for (nameserver, ip) in nameservers {
            match transfer(SocketAddr::new(ip, 53), &zone, self.timeout).await {
                Ok(records) if !records.is_empty() => {
                    info!("Zone transfer allowed by {} ({})", nameserver, ip);
                    names.extend(records);
                }
                Ok(_) => trace!("Zone transfer refused by {} ({})", nameserver, ip),
                Err(err) => trace!("Zone transfer on {} ({}): {}", nameserver, ip, err),
            }
        }

        debug!("{} collected", names.len());
        Ok(names.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::{axfr_query, transfer, AXFR_QUERY_ID};
    use hickory_resolver::proto::op::{Message, MessageType, ResponseCode};
    use hickory_resolver::proto::rr::rdata::{A, SOA};
    use hickory_resolver::proto::rr::{Name, RData, Record, RecordType};
    use std::net::{Ipv4Addr, SocketAddr};
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    fn zone() -> Name {
        Name::from_ascii("example.com.").unwrap()
    }

    fn soa() -> Record {
        let rdata = SOA::new(
            Name::from_ascii("ns1.example.com.").unwrap(),
            Name::from_ascii("hostmaster.example.com.").unwrap(),
            1,
            3600,
            600,
            86400,
            300,
        );
        Record::from_rdata(zone(), 300, RData::SOA(rdata))
    }

    fn a(host: &str) -> Record {
        let name = Name::from_ascii(host).unwrap();
        Record::from_rdata(name, 300, RData::A(A(Ipv4Addr::new(192, 0, 2, 1))))
    }

    fn response(code: ResponseCode, answers: Vec<Record>) -> Vec<u8> {
        let mut message = Message::new();
        message
            .set_id(AXFR_QUERY_ID)
            .set_message_type(MessageType::Response)
            .set_response_code(code);
        for answer in answers {
            message.add_answer(answer);
        }
        message.to_vec().unwrap()
    }

    async fn write_frame(socket: &mut TcpStream, bytes: &[u8]) {
        socket
            .write_all(&(bytes.len() as u16).to_be_bytes())
            .await
            .unwrap();
        socket.write_all(bytes).await.unwrap();
    }

    /// Nameserver reading the query, sending `frames`, then keeping the
    /// connection open without a word.
    async fn nameserver(frames: Vec<Vec<u8>>, trailing_length: Option<u16>) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut length = [0u8; 2];
            socket.read_exact(&mut length).await.unwrap();
            let mut query = vec![0u8; u16::from_be_bytes(length) as usize];
            socket.read_exact(&mut query).await.unwrap();

            for frame in frames {
                write_frame(&mut socket, &frame).await;
            }
            if let Some(length) = trailing_length {
                socket.write_all(&length.to_be_bytes()).await.unwrap();
            }
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        address
    }

    #[test]
    fn axfr_query_for_zone() {
        let zone = zone();
        let bytes = axfr_query(&zone).unwrap();
        let message = Message::from_vec(&bytes).unwrap();

        assert_eq!(message.id(), AXFR_QUERY_ID);
        assert!(!message.recursion_desired());
        assert_eq!(message.queries().len(), 1);
        assert_eq!(message.queries()[0].query_type(), RecordType::AXFR);
        assert_eq!(message.queries()[0].name(), &zone);
    }

    #[tokio::test]
    async fn refused_transfer_is_empty() {
        let address = nameserver(vec![response(ResponseCode::Refused, Vec::new())], None).await;

        let names = transfer(address, &zone(), Duration::from_secs(2)).await.unwrap();

        assert!(names.is_empty());
    }

    #[tokio::test]
    async fn transfer_ends_on_second_soa() {
        let address = nameserver(
            vec![
                response(ResponseCode::NoError, vec![soa(), a("www.example.com.")]),
                response(ResponseCode::NoError, vec![a("mail.example.com."), soa()]),
            ],
            None,
        )
        .await;

        // the server stays connected: only the closing SOA ends the read loop
        let names = transfer(address, &zone(), Duration::from_secs(5)).await.unwrap();

        assert_eq!(
            names,
            vec!["example.com", "www.example.com", "mail.example.com", "example.com"]
        );
    }

    #[tokio::test]
    async fn stalled_transfer_keeps_received_names() {
        let address = nameserver(
            vec![response(ResponseCode::NoError, vec![soa(), a("www.example.com.")])],
            Some(128),
        )
        .await;

        let names = transfer(address, &zone(), Duration::from_millis(200))
            .await
            .unwrap();

        assert_eq!(names, vec!["example.com", "www.example.com"]);
    }

    #[tokio::test]
    async fn garbage_after_answers_keeps_received_names() {
        let address = nameserver(
            vec![
                response(ResponseCode::NoError, vec![soa(), a("www.example.com.")]),
                vec![0xff; 5],
            ],
            None,
        )
        .await;

        let names = transfer(address, &zone(), Duration::from_secs(2)).await.unwrap();

        assert_eq!(names, vec!["example.com", "www.example.com"]);
    }
}
