use std::io::{self, IoSliceMut};

use tokio::net::TcpStream;

/// Reserved slack in front of the readable span so a length or checksum
/// header can be prepended without moving payload bytes.
pub const CHEAP_PREPEND: usize = 8;
pub const INITIAL_SIZE: usize = 1024;

const EXTRABUF_SIZE: usize = 64 * 1024;

/// Growable octet buffer with a read cursor and a write cursor:
///
/// ```text
/// +----------------+------------------+------------------+
/// | prependable    | readable         | writable         |
/// +----------------+------------------+------------------+
/// 0            read_idx           write_idx         data.len()
/// ```
///
/// `retrieve` only advances the read cursor; bytes are moved at most once
/// per growth cycle, inside `ensure_writable`, so total work stays linear
/// in the number of bytes that pass through the buffer.
pub struct Buffer {
    data: Vec<u8>,
    read_idx: usize,
    write_idx: usize,
}

impl Buffer {
    pub fn new() -> Buffer {
        Buffer {
            data: vec![0; CHEAP_PREPEND + INITIAL_SIZE],
            read_idx: CHEAP_PREPEND,
            write_idx: CHEAP_PREPEND,
        }
    }

    pub fn readable_bytes(&self) -> usize {
        self.write_idx - self.read_idx
    }

    pub fn writable_bytes(&self) -> usize {
        self.data.len() - self.write_idx
    }

    pub fn prependable_bytes(&self) -> usize {
        self.read_idx
    }

    /// Borrow of the readable span.
    pub fn peek(&self) -> &[u8] {
        &self.data[self.read_idx..self.write_idx]
    }

    pub fn append(&mut self, bytes: &[u8]) {
        self.ensure_writable(bytes.len());
        self.data[self.write_idx..self.write_idx + bytes.len()].copy_from_slice(bytes);
        self.write_idx += bytes.len();
    }

    /// Consumes up to `n` readable bytes. Draining the buffer completely
    /// re-homes both cursors to the prepend mark, so an empty buffer is
    /// always in its cheapest state.
    pub fn retrieve(&mut self, n: usize) {
        let n = n.min(self.readable_bytes());
        self.read_idx += n;
        if self.read_idx == self.write_idx {
            self.read_idx = CHEAP_PREPEND;
            self.write_idx = CHEAP_PREPEND;
        }
    }

    pub fn retrieve_all(&mut self) {
        self.read_idx = CHEAP_PREPEND;
        self.write_idx = CHEAP_PREPEND;
    }

    /// Copies out and consumes up to `n` readable bytes.
    pub fn retrieve_as_bytes(&mut self, n: usize) -> Vec<u8> {
        let n = n.min(self.readable_bytes());
        let bytes = self.data[self.read_idx..self.read_idx + n].to_vec();
        self.retrieve(n);
        bytes
    }

    /// Offset of the first `\r\n` within the readable span.
    pub fn find_crlf(&self) -> Option<usize> {
        self.peek().windows(2).position(|window| window == b"\r\n")
    }

    pub fn ensure_writable(&mut self, n: usize) {
        if self.writable_bytes() < n {
            self.make_space(n);
        }
    }

    fn make_space(&mut self, n: usize) {
        if self.prependable_bytes() + self.writable_bytes() >= n + CHEAP_PREPEND {
            // Enough room overall; shift the readable span back to the
            // prepend mark instead of reallocating.
            let readable = self.readable_bytes();
            self.data.copy_within(self.read_idx..self.write_idx, CHEAP_PREPEND);
            self.read_idx = CHEAP_PREPEND;
            self.write_idx = CHEAP_PREPEND + readable;
        } else {
            self.data.resize(self.write_idx + n + INITIAL_SIZE, 0);
        }
    }

    /// One scatter read from the socket into the writable span plus a
    /// 64 KiB stack extrabuf. Overflow that landed in the extrabuf is
    /// appended, growing the buffer to fit. `WouldBlock` propagates so the
    /// caller can tell a drained socket from a short read; `Ok(0)` means
    /// the peer closed the connection.
    pub fn read_from(&mut self, stream: &TcpStream) -> io::Result<usize> {
        let mut extrabuf = [0u8; EXTRABUF_SIZE];
        let writable = self.writable_bytes();
        let n = {
            let (_, tail) = self.data.split_at_mut(self.write_idx);
            let mut slices = [IoSliceMut::new(tail), IoSliceMut::new(&mut extrabuf)];
            stream.try_read_vectored(&mut slices)?
        };

        if n <= writable {
            self.write_idx += n;
        } else {
            self.write_idx = self.data.len();
            self.append(&extrabuf[..n - writable]);
        }

        Ok(n)
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    #[test]
    fn append_and_retrieve() {
        let mut buf = Buffer::new();
        assert_eq!(buf.readable_bytes(), 0);
        assert_eq!(buf.writable_bytes(), INITIAL_SIZE);

        buf.append(b"hello");
        assert_eq!(buf.readable_bytes(), 5);
        assert_eq!(buf.writable_bytes(), INITIAL_SIZE - 5);

        let bytes = buf.retrieve_as_bytes(5);
        assert_eq!(bytes, b"hello");
        assert_eq!(buf.readable_bytes(), 0);
        // Full drain resets to the cheap-empty state.
        assert_eq!(buf.writable_bytes(), INITIAL_SIZE);
        assert_eq!(buf.prependable_bytes(), CHEAP_PREPEND);
    }

    #[test]
    fn grows_past_initial_capacity() {
        let mut buf = Buffer::new();
        let big = vec![b'x'; 1200];
        buf.append(&big);
        assert_eq!(buf.readable_bytes(), 1200);
        assert_eq!(buf.retrieve_as_bytes(1200), big);
    }

    #[test]
    fn make_space_shifts_readable_left() {
        let mut buf = Buffer::new();
        buf.append(&[b'x'; 200]);
        buf.retrieve(100);
        assert_eq!(buf.readable_bytes(), 100);
        assert_eq!(buf.prependable_bytes(), CHEAP_PREPEND + 100);

        // 900 more bytes do not fit the writable span, but prepend slack
        // plus writable is enough, so the buffer shifts instead of growing.
        buf.append(&[b'y'; 900]);
        assert_eq!(buf.readable_bytes(), 1000);
        assert_eq!(buf.prependable_bytes(), CHEAP_PREPEND);

        let bytes = buf.retrieve_as_bytes(1000);
        assert!(bytes[..100].iter().all(|&b| b == b'x'));
        assert!(bytes[100..].iter().all(|&b| b == b'y'));
    }

    #[test]
    fn find_crlf_in_readable_span() {
        let mut buf = Buffer::new();
        buf.append(b"hello\r\nworld");
        assert_eq!(buf.find_crlf(), Some(5));

        buf.retrieve(7);
        assert_eq!(buf.find_crlf(), None);
    }

    #[test]
    fn retrieve_clamps_to_readable() {
        let mut buf = Buffer::new();
        buf.append(b"hello");
        buf.retrieve(100);
        assert_eq!(buf.readable_bytes(), 0);
    }

    #[test]
    fn retrieve_all_resets_cursors() {
        let mut buf = Buffer::new();
        buf.append(b"leftover");
        buf.retrieve(3);

        buf.retrieve_all();
        assert_eq!(buf.readable_bytes(), 0);
        assert_eq!(buf.prependable_bytes(), CHEAP_PREPEND);
        assert_eq!(buf.writable_bytes(), INITIAL_SIZE);
    }

    #[test]
    fn append_preserves_binary_content() {
        let mut buf = Buffer::new();
        let data = b"hello\0world\r\n";
        buf.append(data);
        assert_eq!(buf.readable_bytes(), data.len());
        assert_eq!(buf.retrieve_as_bytes(data.len()), data);
    }

    async fn socket_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).await.unwrap();
        let (server, _) = listener.accept().await.unwrap();
        (client, server)
    }

    async fn read_until(buf: &mut Buffer, stream: &TcpStream, expected: usize) {
        while buf.readable_bytes() < expected {
            stream.readable().await.unwrap();
            match buf.read_from(stream) {
                Ok(0) => panic!("peer closed early"),
                Ok(_) => {}
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => {}
                Err(err) => panic!("read failed: {err}"),
            }
        }
    }

    #[tokio::test]
    async fn read_from_socket() {
        let (client, mut server) = socket_pair().await;
        server.write_all(b"some data written to the socket").await.unwrap();
        server.flush().await.unwrap();

        let mut buf = Buffer::new();
        read_until(&mut buf, &client, 31).await;
        assert_eq!(buf.retrieve_as_bytes(31), b"some data written to the socket");
    }

    #[tokio::test]
    async fn read_from_socket_overflows_into_extrabuf() {
        let (client, mut server) = socket_pair().await;
        // Much more than the initial writable span, so at least one read
        // spills into the extrabuf and forces the buffer to grow.
        let payload: Vec<u8> = (0..8000u32).map(|i| (i % 251) as u8).collect();
        server.write_all(&payload).await.unwrap();
        server.flush().await.unwrap();

        let mut buf = Buffer::new();
        read_until(&mut buf, &client, payload.len()).await;
        assert_eq!(buf.retrieve_as_bytes(payload.len()), payload);
    }
}
