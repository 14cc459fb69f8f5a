//! Synchronous hostname lookup.

use std::{
    fmt, io,
    net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket},
    time::{Duration, Instant},
};

use socket2::{Domain, Protocol, Socket, Type};

use crate::{
    hex::Hex,
    nbns::NameRecord,
    query::{self, MdnsPtrQuery},
    response, Error, LookupPort,
};

use crate::{
    MDNS_BUFFER_SIZE, MDNS_MULTICAST_ADDR, NBSTAT_BUFFER_SIZE, NBSTAT_TRANSACTION_ID,
    PTR_TRANSACTION_ID,
};

/// A datagram transport the resolver sends queries over.
pub trait Transport {
    /// Sends `msg` to `dest`.
    fn send_to(&mut self, msg: &[u8], dest: SocketAddr) -> io::Result<()>;

    /// Receives a single datagram into `buf`, waiting at most `timeout`.
    ///
    /// Returns the datagram's length. If nothing arrives in time, an error of kind
    /// [`io::ErrorKind::TimedOut`] or [`io::ErrorKind::WouldBlock`] must be returned.
    fn recv(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize>;
}

/// [`Transport`] over a UDP socket.
pub struct UdpTransport {
    sock: UdpSocket,
}

impl UdpTransport {
    /// Creates a transport bound to an ephemeral port on all interfaces.
    pub fn unicast() -> io::Result<Self> {
        let sock = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
        Ok(Self { sock })
    }

    /// Creates a transport that is a member of the IPv4 mDNS multicast group.
    ///
    /// The socket is still bound to an ephemeral port, so responders treat the query as a
    /// "legacy unicast" query: they reply directly to it and copy its transaction ID.
    pub fn multicast_v4() -> io::Result<Self> {
        let sock = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        sock.set_reuse_address(true)?;
        sock.bind(&SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)).into())?;

        let sock = UdpSocket::from(sock);
        sock.join_multicast_v4(&MDNS_MULTICAST_ADDR, &Ipv4Addr::UNSPECIFIED)?;
        sock.set_multicast_loop_v4(true)?;
        Ok(Self { sock })
    }
}

impl Transport for UdpTransport {
    fn send_to(&mut self, msg: &[u8], dest: SocketAddr) -> io::Result<()> {
        self.sock.send_to(msg, dest)?;
        Ok(())
    }

    fn recv(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
        // A zero duration would disable the timeout entirely.
        if timeout.is_zero() {
            return Err(Error::Timeout.into());
        }
        self.sock.set_read_timeout(Some(timeout))?;
        let (len, addr) = self.sock.recv_from(buf)?;
        log::trace!("recv from {}: {} bytes {}", addr, len, Hex(&buf[..len]));
        Ok(len)
    }
}

/// Returns whether `e` signals that a receive operation timed out.
pub fn is_timeout(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}

/// Outcome of a lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    /// A matching response was received and decoded.
    Resolved(T),
    /// No matching response arrived in time.
    NoResponse,
}

impl<T> Lookup<T> {
    /// Converts into an [`Option`], mapping [`Lookup::NoResponse`] to [`None`].
    pub fn resolved(self) -> Option<T> {
        match self {
            Lookup::Resolved(value) => Some(value),
            Lookup::NoResponse => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
        match self {
            Lookup::Resolved(value) => Lookup::Resolved(f(value)),
            Lookup::NoResponse => Lookup::NoResponse,
        }
    }
}

/// The protocol a host name was obtained with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionMethod {
    Mdns,
    Dns,
    Nbns,
}

impl fmt::Display for ResolutionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResolutionMethod::Mdns => "Multicast DNS",
            ResolutionMethod::Dns => "DNS",
            ResolutionMethod::Nbns => "NetBIOS Name Service",
        })
    }
}

/// A host name and the protocol it was obtained with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hostname {
    pub name: String,
    pub method: ResolutionMethod,
}

impl fmt::Display for Hostname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (via {})", self.name, self.method)
    }
}

/// Sends `msg` to `dest` and waits for a datagram that `decode` accepts.
///
/// Datagrams for which `decode` returns [`Error::NotOurResponse`] are dropped silently, other
/// decoding errors are logged and the datagram dropped. The wait ends once `timeout` has elapsed
/// since the query was sent.
pub fn transact<T, R>(
    transport: &mut T,
    msg: &[u8],
    dest: SocketAddr,
    buf_size: usize,
    timeout: Duration,
    mut decode: impl FnMut(&[u8]) -> Result<R, Error>,
) -> io::Result<Lookup<R>>
where
    T: Transport + ?Sized,
{
    log::trace!("query to {}: {}", dest, Hex(msg));
    transport.send_to(msg, dest)?;

    let deadline = Instant::now() + timeout;
    let mut buf = vec![0; buf_size];
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let len = match transport.recv(&mut buf, remaining) {
            Ok(len) => len,
            Err(e) if is_timeout(&e) => {
                log::debug!("no response from {} within {:?}", dest, timeout);
                return Ok(Lookup::NoResponse);
            }
            Err(e) => return Err(e),
        };

        match decode(&buf[..len]) {
            Ok(value) => return Ok(Lookup::Resolved(value)),
            Err(Error::NotOurResponse) => {
                log::trace!("ignoring unrelated datagram ({} bytes)", len);
            }
            Err(e) => {
                log::warn!("failed to decode response to query for {}: {}", dest, e);
            }
        }
    }
}

/// A simple, synchronous resolver for the host names of LAN hosts.
pub struct SyncResolver<T = UdpTransport> {
    unicast: T,
    multicast: T,
    timeout: Duration,
}

impl SyncResolver<UdpTransport> {
    /// Creates a resolver that uses UDP sockets.
    pub fn new() -> io::Result<Self> {
        Ok(Self::with_transports(
            UdpTransport::unicast()?,
            UdpTransport::multicast_v4()?,
        ))
    }
}

impl<T: Transport> SyncResolver<T> {
    /// The default time to wait for a response.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(2000);

    /// Creates a resolver that sends unicast queries (DNS and NBNS) over `unicast`, and mDNS
    /// queries over `multicast`.
    pub fn with_transports(unicast: T, multicast: T) -> Self {
        Self {
            unicast,
            multicast,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Sets the time to wait for a matching response to a query.
    ///
    /// Unrelated datagrams arriving in the meantime do not extend the wait.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    #[inline]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Looks up the host name of `addr` with a multicast DNS reverse query.
    pub fn lookup_mdns(&mut self, addr: Ipv4Addr) -> io::Result<Lookup<String>> {
        let dest = SocketAddrV4::new(MDNS_MULTICAST_ADDR, LookupPort::Mdns.number());
        let query = query::build_mdns_ptr_query_for(PTR_TRANSACTION_ID, addr);
        ptr_transact(&mut self.multicast, &query, dest.into(), self.timeout)
    }

    /// Looks up the host name of `addr` with a reverse query sent to a DNS server on `addr`
    /// itself.
    pub fn lookup_dns(&mut self, addr: Ipv4Addr) -> io::Result<Lookup<String>> {
        let dest = SocketAddrV4::new(addr, LookupPort::Dns.number());
        let query = query::build_mdns_ptr_query_for(PTR_TRANSACTION_ID, addr);
        ptr_transact(&mut self.unicast, &query, dest.into(), self.timeout)
    }

    /// Asks the NetBIOS name service on `addr` for all names it has registered.
    pub fn lookup_nbns(&mut self, addr: Ipv4Addr) -> io::Result<Lookup<Vec<NameRecord>>> {
        let dest = SocketAddrV4::new(addr, LookupPort::Nbstat.number());
        let msg = query::build_nbns_nbstat_query(NBSTAT_TRANSACTION_ID);
        transact(
            &mut self.unicast,
            &msg,
            dest.into(),
            NBSTAT_BUFFER_SIZE,
            self.timeout,
            |buf| response::parse_nbns_nbstat_records(buf, NBSTAT_TRANSACTION_ID),
        )
    }

    /// Looks up the host name of `addr`, trying multicast DNS, unicast DNS, and NetBIOS in that
    /// order.
    ///
    /// An I/O error during the mDNS or DNS attempt is logged and the next method is tried. Only
    /// errors of the final NetBIOS attempt are returned.
    ///
    /// The NetBIOS name reported is the first one the host lists, which is its workstation name.
    pub fn lookup_hostname(&mut self, addr: Ipv4Addr) -> io::Result<Lookup<Hostname>> {
        match self.lookup_mdns(addr) {
            Ok(Lookup::Resolved(name)) => {
                return Ok(Lookup::Resolved(Hostname {
                    name,
                    method: ResolutionMethod::Mdns,
                }));
            }
            Ok(Lookup::NoResponse) => {}
            Err(e) => log::debug!("mDNS lookup of {} failed: {}", addr, e),
        }

        match self.lookup_dns(addr) {
            Ok(Lookup::Resolved(name)) => {
                return Ok(Lookup::Resolved(Hostname {
                    name,
                    method: ResolutionMethod::Dns,
                }));
            }
            Ok(Lookup::NoResponse) => {}
            Err(e) => log::debug!("DNS lookup of {} failed: {}", addr, e),
        }

        let records = match self.lookup_nbns(addr)? {
            Lookup::Resolved(records) => records,
            Lookup::NoResponse => return Ok(Lookup::NoResponse),
        };
        match records.into_iter().next() {
            Some(record) => Ok(Lookup::Resolved(Hostname {
                name: record.name,
                method: ResolutionMethod::Nbns,
            })),
            None => {
                log::debug!("{} has no registered NetBIOS names", addr);
                Ok(Lookup::NoResponse)
            }
        }
    }
}

fn ptr_transact<T: Transport>(
    transport: &mut T,
    query: &MdnsPtrQuery,
    dest: SocketAddr,
    timeout: Duration,
) -> io::Result<Lookup<String>> {
    transact(
        transport,
        &query.bytes,
        dest,
        MDNS_BUFFER_SIZE,
        timeout,
        |buf| response::parse_mdns_ptr_response(buf, PTR_TRANSACTION_ID, query.question_len),
    )
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::{name, packet::Header};

    /// Replays scripted datagrams and records what was sent.
    #[derive(Default)]
    struct ScriptedTransport {
        sent: Vec<(Vec<u8>, SocketAddr)>,
        incoming: VecDeque<io::Result<Vec<u8>>>,
        /// Timeouts passed to `recv`, in call order.
        timeouts: Vec<Duration>,
        /// Time each datagram takes to "arrive".
        delay: Duration,
    }

    impl ScriptedTransport {
        fn respond_with(mut self, datagram: Vec<u8>) -> Self {
            self.incoming.push_back(Ok(datagram));
            self
        }

        fn fail_with(mut self, kind: io::ErrorKind) -> Self {
            self.incoming.push_back(Err(kind.into()));
            self
        }
    }

    impl Transport for ScriptedTransport {
        fn send_to(&mut self, msg: &[u8], dest: SocketAddr) -> io::Result<()> {
            self.sent.push((msg.to_vec(), dest));
            Ok(())
        }

        fn recv(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
            self.timeouts.push(timeout);
            if timeout.is_zero() {
                return Err(Error::Timeout.into());
            }
            match self.incoming.pop_front() {
                Some(Ok(datagram)) => {
                    std::thread::sleep(self.delay);
                    // Like `recv_from`, silently drop whatever does not fit.
                    let len = datagram.len().min(buf.len());
                    buf[..len].copy_from_slice(&datagram[..len]);
                    Ok(len)
                }
                Some(Err(e)) => Err(e),
                None => Err(Error::Timeout.into()),
            }
        }
    }

    fn ptr_response(id: u16, query: &MdnsPtrQuery, host: &str) -> Vec<u8> {
        let mut header = Header::decode(&query.bytes).unwrap();
        header.set_id(id);
        header.set_response(true);
        header.set_authority(true);
        header.set_answer_count(1);

        let rdata = name::encode_forward(host).unwrap();
        let mut msg = Vec::from(header.encode());
        msg.extend(&query.bytes[Header::LEN..]);
        msg.extend([0xc0, 0x0c, 0x00, 0x0c, 0x80, 0x01, 0x00, 0x00, 0x00, 0x78]);
        msg.extend((rdata.len() as u16).to_be_bytes());
        msg.extend(rdata);
        msg
    }

    fn nbstat_response(id: u16, names: &[&str]) -> Vec<u8> {
        let mut msg = Vec::from(Header::query(id).encode());
        msg.extend(crate::nbns::build_query_name());
        msg.extend([0x00, 0x21, 0x00, 0x01, 0, 0, 0, 0]);
        let rdlength = 1 + names.len() * 18;
        msg.extend((rdlength as u16).to_be_bytes());
        msg.push(names.len() as u8);
        for name in names {
            msg.extend(format!("{:<15}", name).bytes());
            msg.extend([0x00, 0x04, 0x00]);
        }
        msg
    }

    const HOST: Ipv4Addr = Ipv4Addr::new(192, 168, 0, 10);

    #[test]
    fn mdns_skips_unrelated_datagrams() {
        let query = query::build_mdns_ptr_query_for(PTR_TRANSACTION_ID, HOST);
        let multicast = ScriptedTransport::default()
            .respond_with(ptr_response(0x0000, &query, "other.local"))
            .respond_with(vec![0xfe])
            .respond_with(ptr_response(PTR_TRANSACTION_ID, &query, "device.local"));
        let mut resolver = SyncResolver::with_transports(ScriptedTransport::default(), multicast);

        assert_eq!(
            resolver.lookup_mdns(HOST).unwrap(),
            Lookup::Resolved("device.local".to_string())
        );
        let (sent, dest) = &resolver.multicast.sent[0];
        assert_eq!(*sent, query.bytes);
        assert_eq!(*dest, "224.0.0.251:5353".parse::<SocketAddr>().unwrap());
        assert!(resolver.unicast.sent.is_empty());
    }

    #[test]
    fn mdns_times_out() {
        let query = query::build_mdns_ptr_query_for(PTR_TRANSACTION_ID, HOST);
        let multicast =
            ScriptedTransport::default().respond_with(ptr_response(0x1234, &query, "other.local"));
        let mut resolver = SyncResolver::with_transports(ScriptedTransport::default(), multicast);
        assert_eq!(resolver.lookup_mdns(HOST).unwrap(), Lookup::NoResponse);
    }

    #[test]
    fn io_errors_propagate() {
        let multicast = ScriptedTransport::default().fail_with(io::ErrorKind::ConnectionRefused);
        let mut resolver = SyncResolver::with_transports(ScriptedTransport::default(), multicast);
        let err = resolver.lookup_mdns(HOST).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionRefused);
    }

    #[test]
    fn nbns_lookup() {
        let unicast = ScriptedTransport::default()
            .respond_with(nbstat_response(NBSTAT_TRANSACTION_ID, &["MINIPIG", "WORKGROUP"]));
        let mut resolver = SyncResolver::with_transports(unicast, ScriptedTransport::default());
        let records = resolver.lookup_nbns(HOST).unwrap().resolved().unwrap();
        let names = records.iter().map(|r| r.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, ["MINIPIG", "WORKGROUP"]);

        let (sent, dest) = &resolver.unicast.sent[0];
        assert_eq!(*sent, query::build_nbns_nbstat_query(NBSTAT_TRANSACTION_ID));
        assert_eq!(*dest, "192.168.0.10:137".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn hostname_falls_back_to_nbns() {
        // mDNS and DNS time out, NBNS answers.
        let unicast = ScriptedTransport::default()
            .fail_with(io::ErrorKind::TimedOut)
            .respond_with(nbstat_response(NBSTAT_TRANSACTION_ID, &["MINIPIG"]));
        let mut resolver = SyncResolver::with_transports(unicast, ScriptedTransport::default());
        let hostname = resolver.lookup_hostname(HOST).unwrap();
        assert_eq!(
            hostname,
            Lookup::Resolved(Hostname {
                name: "MINIPIG".into(),
                method: ResolutionMethod::Nbns,
            })
        );

        let dests = resolver
            .unicast
            .sent
            .iter()
            .map(|(_, dest)| dest.port())
            .collect::<Vec<_>>();
        assert_eq!(dests, [53, 137]);
        assert_eq!(resolver.multicast.sent.len(), 1);
    }

    #[test]
    fn hostname_prefers_mdns() {
        let query = query::build_mdns_ptr_query_for(PTR_TRANSACTION_ID, HOST);
        let multicast = ScriptedTransport::default()
            .respond_with(ptr_response(PTR_TRANSACTION_ID, &query, "device.local"));
        let mut resolver = SyncResolver::with_transports(ScriptedTransport::default(), multicast);
        let hostname = resolver.lookup_hostname(HOST).unwrap().resolved().unwrap();
        assert_eq!(hostname.to_string(), "device.local (via Multicast DNS)");
        assert!(resolver.unicast.sent.is_empty());
    }

    #[test]
    fn hostname_unresolved() {
        let mut resolver = SyncResolver::with_transports(
            ScriptedTransport::default(),
            ScriptedTransport::default(),
        );
        assert_eq!(resolver.lookup_hostname(HOST).unwrap(), Lookup::NoResponse);
        // An NBNS host without names counts as unresolved too.
        let unicast = ScriptedTransport::default()
            .fail_with(io::ErrorKind::TimedOut)
            .respond_with(nbstat_response(NBSTAT_TRANSACTION_ID, &[]));
        let mut resolver = SyncResolver::with_transports(unicast, ScriptedTransport::default());
        assert_eq!(resolver.lookup_hostname(HOST).unwrap(), Lookup::NoResponse);
    }

    #[test]
    fn hostname_continues_after_io_errors() {
        let multicast = ScriptedTransport::default().fail_with(io::ErrorKind::NetworkUnreachable);
        let unicast = ScriptedTransport::default()
            .fail_with(io::ErrorKind::ConnectionRefused)
            .respond_with(nbstat_response(NBSTAT_TRANSACTION_ID, &["MINIPIG"]));
        let mut resolver = SyncResolver::with_transports(unicast, multicast);
        assert_eq!(
            resolver.lookup_hostname(HOST).unwrap(),
            Lookup::Resolved(Hostname {
                name: "MINIPIG".into(),
                method: ResolutionMethod::Nbns,
            })
        );
        let ports = resolver
            .unicast
            .sent
            .iter()
            .map(|(_, dest)| dest.port())
            .collect::<Vec<_>>();
        assert_eq!(ports, [53, 137]);
    }

    #[test]
    fn hostname_returns_nbns_error() {
        let multicast = ScriptedTransport::default().fail_with(io::ErrorKind::NetworkUnreachable);
        let unicast = ScriptedTransport::default()
            .fail_with(io::ErrorKind::TimedOut)
            .fail_with(io::ErrorKind::ConnectionRefused);
        let mut resolver = SyncResolver::with_transports(unicast, multicast);
        let err = resolver.lookup_hostname(HOST).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionRefused);
    }

    #[test]
    fn nbns_lookup_many_names() {
        for count in [30, 255] {
            let names = (0..count).map(|i| format!("HOST-{}", i)).collect::<Vec<_>>();
            let names = names.iter().map(String::as_str).collect::<Vec<_>>();
            let mut datagram = nbstat_response(NBSTAT_TRANSACTION_ID, &names);
            // Node statistics follow the name records.
            datagram.extend([0; 46]);
            assert!(datagram.len() > crate::DNS_BUFFER_SIZE);
            assert!(datagram.len() <= NBSTAT_BUFFER_SIZE);

            let unicast = ScriptedTransport::default().respond_with(datagram);
            let mut resolver = SyncResolver::with_transports(unicast, ScriptedTransport::default());
            let records = resolver.lookup_nbns(HOST).unwrap().resolved().unwrap();
            assert_eq!(records.len(), count);
            assert_eq!(records[count - 1].name, format!("HOST-{}", count - 1));
        }
    }

    #[test]
    fn unrelated_datagrams_do_not_extend_deadline() {
        let query = query::build_mdns_ptr_query_for(PTR_TRANSACTION_ID, HOST);
        let mut multicast = ScriptedTransport::default()
            .respond_with(ptr_response(0x0001, &query, "other.local"))
            .respond_with(ptr_response(0x0002, &query, "other.local"))
            .respond_with(ptr_response(PTR_TRANSACTION_ID, &query, "late.local"));
        multicast.delay = Duration::from_millis(20);
        let mut resolver = SyncResolver::with_transports(ScriptedTransport::default(), multicast);
        resolver.set_timeout(Duration::from_millis(30));

        assert_eq!(resolver.lookup_mdns(HOST).unwrap(), Lookup::NoResponse);

        // Each wait gets shorter, until the deadline has passed.
        let timeouts = &resolver.multicast.timeouts;
        assert!(timeouts[0] <= Duration::from_millis(30), "{:?}", timeouts);
        assert!(timeouts.windows(2).all(|w| w[1] < w[0]), "{:?}", timeouts);
        assert_eq!(timeouts.last(), Some(&Duration::ZERO));
        // Two 20 ms arrivals exceed the deadline, so the matching response is never picked up.
        assert!(resolver.multicast.incoming.back().is_some());
    }
}
