//! 进程内的假DNS服务器，同时监听同一端口的UDP与TCP

use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, UdpSocket};
use trust_dns_resolver::proto::op::{Message, MessageType, ResponseCode};
use trust_dns_resolver::proto::rr::rdata::{A, CNAME};
use trust_dns_resolver::proto::rr::{Name, RData, Record, RecordType};

/// UDP端的行为
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UdpBehavior {
    /// 正常应答
    Answer,
    /// 应答但不带任何记录
    Empty,
    /// 不回应，客户端只能超时
    Drop,
}

#[derive(Debug, Clone, Default)]
pub struct Zone {
    records: HashMap<(String, RecordType), Vec<RData>>,
}

impl Zone {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn a(mut self, name: &str, ip: Ipv4Addr) -> Self {
        self.insert(name, RecordType::A, RData::A(A(ip)));
        self
    }

    pub fn cname(mut self, name: &str, target: &str) -> Self {
        let target = Name::from_ascii(target).expect("valid target name");
        self.insert(name, RecordType::CNAME, RData::CNAME(CNAME(target)));
        self
    }

    fn insert(&mut self, name: &str, record_type: RecordType, rdata: RData) {
        self.records
            .entry((absolute(name), record_type))
            .or_default()
            .push(rdata);
    }

    fn respond(&self, request: &Message, with_answers: bool) -> Message {
        let mut response = Message::new();
        response
            .set_id(request.id())
            .set_message_type(MessageType::Response)
            .set_op_code(request.op_code())
            .set_recursion_desired(request.recursion_desired())
            .set_authoritative(true);

        for query in request.queries() {
            response.add_query(query.clone());
            if !with_answers {
                continue;
            }

            let name = absolute(&query.name().to_string());
            let exact = self.records.get(&(name.clone(), query.query_type()));
            // 与真实服务器一样，别名在任意类型的查询中都会出现在应答段
            let alias = self.records.get(&(name, RecordType::CNAME));
            match exact.or(alias) {
                Some(rdatas) => {
                    for rdata in rdatas {
                        response.add_answer(Record::from_rdata(query.name().clone(), 300, rdata.clone()));
                    }
                }
                None => {
                    response.set_response_code(ResponseCode::NXDomain);
                }
            }
        }
        response
    }
}

fn absolute(name: &str) -> String {
    format!("{}.", name.trim_end_matches('.').to_lowercase())
}

pub struct FakeNameserver {
    pub addr: SocketAddr,
    udp_queries: Arc<AtomicUsize>,
    tcp_queries: Arc<AtomicUsize>,
}

impl FakeNameserver {
    pub async fn start(zone: Zone, behavior: UdpBehavior) -> Self {
        let (listener, udp) = bind_pair().await;
        let addr = listener.local_addr().expect("local addr");
        let zone = Arc::new(zone);
        let udp_queries = Arc::new(AtomicUsize::new(0));
        let tcp_queries = Arc::new(AtomicUsize::new(0));

        let udp_zone = Arc::clone(&zone);
        let udp_counter = Arc::clone(&udp_queries);
        tokio::spawn(async move {
            let mut buf = vec![0u8; 4096];
            loop {
                let (len, peer) = match udp.recv_from(&mut buf).await {
                    Ok(received) => received,
                    Err(_) => continue,
                };
                udp_counter.fetch_add(1, Ordering::SeqCst);
                let request = match Message::from_vec(&buf[..len]) {
                    Ok(request) => request,
                    Err(_) => continue,
                };
                let response = match behavior {
                    UdpBehavior::Drop => continue,
                    UdpBehavior::Empty => udp_zone.respond(&request, false),
                    UdpBehavior::Answer => udp_zone.respond(&request, true),
                };
                if let Ok(bytes) = response.to_vec() {
                    let _ = udp.send_to(&bytes, peer).await;
                }
            }
        });

        let tcp_counter = Arc::clone(&tcp_queries);
        tokio::spawn(async move {
            loop {
                let (mut stream, _) = match listener.accept().await {
                    Ok(accepted) => accepted,
                    Err(_) => continue,
                };
                let zone = Arc::clone(&zone);
                let counter = Arc::clone(&tcp_counter);
                tokio::spawn(async move {
                    loop {
                        let mut len_buf = [0u8; 2];
                        if stream.read_exact(&mut len_buf).await.is_err() {
                            break;
                        }
                        let mut buf = vec![0u8; u16::from_be_bytes(len_buf) as usize];
                        if stream.read_exact(&mut buf).await.is_err() {
                            break;
                        }
                        counter.fetch_add(1, Ordering::SeqCst);
                        let Ok(request) = Message::from_vec(&buf) else { break };
                        let Ok(bytes) = zone.respond(&request, true).to_vec() else { break };
                        let len = (bytes.len() as u16).to_be_bytes();
                        if stream.write_all(&len).await.is_err() || stream.write_all(&bytes).await.is_err() {
                            break;
                        }
                    }
                });
            }
        });

        FakeNameserver {
            addr,
            udp_queries,
            tcp_queries,
        }
    }

    pub fn udp_queries(&self) -> usize {
        self.udp_queries.load(Ordering::SeqCst)
    }

    pub fn tcp_queries(&self) -> usize {
        self.tcp_queries.load(Ordering::SeqCst)
    }
}

/// 在同一个端口上绑定TCP与UDP
async fn bind_pair() -> (TcpListener, UdpSocket) {
    for _ in 0..20 {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind tcp");
        let port = listener.local_addr().expect("local addr").port();
        if let Ok(udp) = UdpSocket::bind(("127.0.0.1", port)).await {
            return (listener, udp);
        }
    }
    panic!("no free port for udp+tcp pair");
}

/// 示例区域: www / mail(CNAME) / mailhost / dev
pub fn lab_zone() -> Zone {
    Zone::new()
        .a("www.example.htb", Ipv4Addr::new(10, 0, 0, 5))
        .cname("mail.example.htb", "mailhost.example.htb.")
        .a("mailhost.example.htb", Ipv4Addr::new(10, 0, 0, 9))
        .a("dev.example.htb", Ipv4Addr::new(1, 2, 3, 203))
        .a("ops.example.htb", Ipv4Addr::new(1, 2, 3, 10))
}
