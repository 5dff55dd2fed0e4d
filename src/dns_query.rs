//! 原始DNS查询
//!
//! 对单个名称、单个记录类型向指定DNS服务器发起一次查询：先走UDP，
//! 失败或无应答时按配置改走TCP。报文的编解码交给 trust-dns-proto，
//! 这里只负责收发和结果分类，任何传输错误都不会抛给调用方。

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, trace};
use rand::Rng;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tokio::time::timeout;
use trust_dns_resolver::proto::op::{Message, MessageType, OpCode, Query};
use trust_dns_resolver::proto::rr::{Name, RecordType};

use crate::error::QueryError;
use crate::model::ResolverConfig;

/// UDP接收缓冲区大小
const UDP_BUFFER_SIZE: usize = 4096;

/// 传输方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transport {
    Udp,
    Tcp,
}

/// 单次查询的结果
#[derive(Debug)]
pub enum Lookup {
    /// 应答段非空，值为与查询类型匹配的记录（按服务器返回顺序）
    Answers(Vec<String>),
    /// 服务器有响应，但应答段为空
    NoData,
    /// 超时、拒绝连接、报文异常等
    Failed(QueryError),
}

impl Lookup {
    pub fn into_values(self) -> Vec<String> {
        match self {
            Lookup::Answers(values) => values,
            Lookup::NoData | Lookup::Failed(_) => Vec::new(),
        }
    }

    pub fn is_answered(&self) -> bool {
        matches!(self, Lookup::Answers(_))
    }
}

/// 向单个DNS服务器收发查询的客户端
#[async_trait]
pub trait DnsClient: Send + Sync {
    async fn exchange(&self, name: &str, record_type: RecordType, transport: Transport) -> Lookup;
}

/// 为每次解析任务构造独立的客户端
///
/// 并发执行的解析任务之间不共享任何查询或传输状态。
pub trait ClientFactory: Send + Sync + 'static {
    type Client: DnsClient + 'static;

    fn build(&self, config: &ResolverConfig) -> Self::Client;
}

/// 基于tokio套接字的客户端
#[derive(Debug, Clone)]
pub struct NameserverClient {
    nameserver: SocketAddr,
    timeout: Duration,
}

impl NameserverClient {
    pub fn new(nameserver: SocketAddr, timeout: Duration) -> Self {
        NameserverClient { nameserver, timeout }
    }

    async fn query_udp(&self, request: &[u8]) -> Result<Message, QueryError> {
        let bind_addr = if self.nameserver.is_ipv4() {
            SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
        } else {
            SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
        };

        let exchange = async {
            let socket = UdpSocket::bind(bind_addr).await?;
            socket.connect(self.nameserver).await?;
            socket.send(request).await?;

            let mut buf = vec![0u8; UDP_BUFFER_SIZE];
            let len = socket.recv(&mut buf).await?;
            let response = Message::from_vec(&buf[..len])?;
            if response.truncated() {
                return Err(QueryError::Truncated);
            }
            Ok::<_, QueryError>(response)
        };

        timeout(self.timeout, exchange)
            .await
            .map_err(|_| QueryError::Timeout(self.timeout))?
    }

    async fn query_tcp(&self, request: &[u8]) -> Result<Message, QueryError> {
        let exchange = async {
            let mut stream = TcpStream::connect(self.nameserver).await?;

            // TCP报文带两字节长度前缀
            let len = request.len() as u16;
            stream.write_all(&len.to_be_bytes()).await?;
            stream.write_all(request).await?;

            let mut len_buf = [0u8; 2];
            stream.read_exact(&mut len_buf).await?;
            let mut resp_buf = vec![0u8; u16::from_be_bytes(len_buf) as usize];
            stream.read_exact(&mut resp_buf).await?;

            Ok::<_, QueryError>(Message::from_vec(&resp_buf)?)
        };

        timeout(self.timeout, exchange)
            .await
            .map_err(|_| QueryError::Timeout(self.timeout))?
    }
}

#[async_trait]
impl DnsClient for NameserverClient {
    async fn exchange(&self, name: &str, record_type: RecordType, transport: Transport) -> Lookup {
        let (id, request) = match build_query(name, record_type) {
            Ok(query) => query,
            Err(e) => return Lookup::Failed(e),
        };

        let response = match transport {
            Transport::Udp => self.query_udp(&request).await,
            Transport::Tcp => self.query_tcp(&request).await,
        };

        match response {
            Ok(message) if message.id() != id => Lookup::Failed(QueryError::IdMismatch {
                expected: id,
                got: message.id(),
            }),
            Ok(message) => answer_values(&message, record_type),
            Err(e) => Lookup::Failed(e),
        }
    }
}

/// 默认的客户端工厂：每次构造一个新的 [`NameserverClient`]
#[derive(Debug, Clone, Copy, Default)]
pub struct NetworkClientFactory;

impl ClientFactory for NetworkClientFactory {
    type Client = NameserverClient;

    fn build(&self, config: &ResolverConfig) -> NameserverClient {
        NameserverClient::new(config.nameserver, config.timeout)
    }
}

/// 构造查询报文，返回 (报文ID, 编码后的字节)
fn build_query(name: &str, record_type: RecordType) -> Result<(u16, Vec<u8>), QueryError> {
    let name = Name::from_ascii(name)?;
    let id: u16 = rand::thread_rng().gen();

    let mut message = Message::new();
    message
        .set_id(id)
        .set_message_type(MessageType::Query)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(true)
        .add_query(Query::query(name, record_type));

    Ok((id, message.to_vec()?))
}

fn answer_values(response: &Message, record_type: RecordType) -> Lookup {
    if response.answers().is_empty() {
        return Lookup::NoData;
    }

    let values = response
        .answers()
        .iter()
        .filter(|record| record.record_type() == record_type)
        .filter_map(|record| record.data().map(|data| data.to_string()))
        .collect();
    Lookup::Answers(values)
}

/// 在单个客户端之上实现UDP->TCP回退
pub struct QueryExecutor<C> {
    client: C,
    tcp_fallback: bool,
}

impl<C: DnsClient> QueryExecutor<C> {
    pub fn new(client: C, tcp_fallback: bool) -> Self {
        QueryExecutor {
            client,
            tcp_fallback,
        }
    }

    /// 查询并只返回值列表，失败时为空
    pub async fn query(&self, name: &str, record_type: RecordType) -> Vec<String> {
        self.lookup(name, record_type).await.into_values()
    }

    pub async fn lookup(&self, name: &str, record_type: RecordType) -> Lookup {
        let udp = self.client.exchange(name, record_type, Transport::Udp).await;
        match &udp {
            Lookup::Answers(values) => {
                trace!("{} {} -> {:?}", name, record_type, values);
                return udp;
            }
            Lookup::NoData => debug!("{} {} UDP无应答", name, record_type),
            Lookup::Failed(e) => debug!("{} {} UDP查询失败: {}", name, record_type, e),
        }

        if !self.tcp_fallback {
            return udp;
        }

        let tcp = self.client.exchange(name, record_type, Transport::Tcp).await;
        match &tcp {
            Lookup::Answers(values) => trace!("{} {} (TCP) -> {:?}", name, record_type, values),
            Lookup::NoData => debug!("{} {} TCP无应答", name, record_type),
            Lookup::Failed(e) => debug!("{} {} TCP查询失败: {}", name, record_type, e),
        }
        tcp
    }
}
