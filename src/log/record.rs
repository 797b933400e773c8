use crate::error::{Error, Result};
use crate::types::{Key, Value};

/// A single mutation inside a batch record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    /// Insert or overwrite a record.
    Put { key: Key, value: Value },
    /// Remove a record.
    Delete { key: Key },
    /// Remove every record.
    Clear,
}

impl Op {
    pub fn put(key: impl Into<Key>, value: impl Into<Value>) -> Self {
        Op::Put {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn delete(key: impl Into<Key>) -> Self {
        Op::Delete { key: key.into() }
    }

    fn tag(&self) -> u8 {
        match self {
            Op::Put { .. } => TAG_PUT,
            Op::Delete { .. } => TAG_DELETE,
            Op::Clear => TAG_CLEAR,
        }
    }

    /// Bytes this op occupies inside a record payload.
    fn encoded_size(&self) -> usize {
        match self {
            Op::Put { key, value } => TAG_SIZE + LEN_SIZE + key.len() + LEN_SIZE + value.len(),
            Op::Delete { key } => TAG_SIZE + LEN_SIZE + key.len(),
            Op::Clear => TAG_SIZE,
        }
    }
}

const TAG_PUT: u8 = 0x01;
const TAG_DELETE: u8 = 0x02;
const TAG_CLEAR: u8 = 0x03;

// Header sizes
const CRC_SIZE: usize = 4;
const LEN_SIZE: usize = 4;
const TAG_SIZE: usize = 1;
const COUNT_SIZE: usize = 4;
const HEADER_SIZE: usize = CRC_SIZE + LEN_SIZE;

/// One committed unit of work: a batch of mutations framed as a single
/// log record.
///
/// On-disk format:
/// ```text
/// ┌──────────┬──────────────┬─────────────┬──────┬──────┬───────┐
/// │ CRC (4B) │ Pay. Len(4B) │ Op Count(4B)│ Op 0 │ Op 1 │  ...  │
/// └──────────┴──────────────┴─────────────┴──────┴──────┴───────┘
/// Op: [Tag(1B)][Key Len(4B)][Key][Val Len(4B)][Value]
///     Put = 0x01 (key + value), Delete = 0x02 (key only), Clear = 0x03
/// ```
///
/// CRC covers everything after the CRC field. If CRC doesn't match on
/// read, the record was a partial write (crash mid-write) and recovery
/// stops here — all preceding records are valid. Because the whole
/// batch lives in one record, a commit is atomic by construction:
/// either every op replays or none does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub ops: Vec<Op>,
}

impl Batch {
    /// A batch holding a single op. Non-transactional mutations use this.
    pub fn single(op: Op) -> Self {
        Batch { ops: vec![op] }
    }

    /// Serialize this batch to bytes (including CRC header). Fails with
    /// `InvalidArgument` if the batch would exceed the 4 GiB record
    /// framing limit.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let payload_len: usize =
            COUNT_SIZE + self.ops.iter().map(Op::encoded_size).sum::<usize>();
        // Every per-op length below is bounded by payload_len, so this
        // is the only conversion that can truncate.
        let payload_len = u32::try_from(payload_len).map_err(|_| {
            Error::InvalidArgument("batch exceeds the 4 GiB record limit".into())
        })?;
        let mut buf = Vec::with_capacity(HEADER_SIZE + payload_len as usize);

        // Reserve space for CRC (filled at the end)
        buf.extend_from_slice(&[0u8; CRC_SIZE]);

        // Payload length
        buf.extend_from_slice(&payload_len.to_le_bytes());

        // Op count
        buf.extend_from_slice(&(self.ops.len() as u32).to_le_bytes());

        for op in &self.ops {
            buf.push(op.tag());
            match op {
                Op::Put { key, value } => {
                    buf.extend_from_slice(&(key.len() as u32).to_le_bytes());
                    buf.extend_from_slice(key);
                    buf.extend_from_slice(&(value.len() as u32).to_le_bytes());
                    buf.extend_from_slice(value);
                }
                Op::Delete { key } => {
                    buf.extend_from_slice(&(key.len() as u32).to_le_bytes());
                    buf.extend_from_slice(key);
                }
                Op::Clear => {}
            }
        }

        // Compute CRC over everything after the CRC field
        let crc = crc32fast::hash(&buf[CRC_SIZE..]);
        buf[0..CRC_SIZE].copy_from_slice(&crc.to_le_bytes());

        Ok(buf)
    }

    /// Deserialize one batch from the front of `data`, returning the
    /// batch and the number of bytes it occupied. Returns an error if
    /// the record is truncated or its CRC doesn't match.
    pub fn decode(data: &[u8]) -> Result<(Self, usize)> {
        if data.len() < HEADER_SIZE {
            return Err(Error::Corruption("record too short".into()));
        }

        let stored_crc = u32::from_le_bytes(data[0..4].try_into().unwrap());
        let payload_len = u32::from_le_bytes(data[4..8].try_into().unwrap()) as usize;

        let total_len = HEADER_SIZE + payload_len;
        if data.len() < total_len {
            return Err(Error::Corruption("record truncated".into()));
        }

        let computed_crc = crc32fast::hash(&data[CRC_SIZE..total_len]);
        if stored_crc != computed_crc {
            return Err(Error::Corruption("CRC mismatch".into()));
        }

        let payload = &data[HEADER_SIZE..total_len];
        if payload.len() < COUNT_SIZE {
            return Err(Error::Corruption("payload too short for op count".into()));
        }
        let op_count = u32::from_le_bytes(payload[0..4].try_into().unwrap()) as usize;

        let mut ops = Vec::with_capacity(op_count);
        let mut offset = COUNT_SIZE;
        for _ in 0..op_count {
            let (op, consumed) = decode_op(&payload[offset..])?;
            ops.push(op);
            offset += consumed;
        }
        if offset != payload.len() {
            return Err(Error::Corruption("trailing bytes in record payload".into()));
        }

        Ok((Batch { ops }, total_len))
    }

    /// Size of this batch when serialized on disk.
    pub fn encoded_size(&self) -> usize {
        HEADER_SIZE + COUNT_SIZE + self.ops.iter().map(Op::encoded_size).sum::<usize>()
    }
}

fn decode_op(data: &[u8]) -> Result<(Op, usize)> {
    if data.is_empty() {
        return Err(Error::Corruption("op truncated".into()));
    }
    let tag = data[0];
    let mut offset = TAG_SIZE;

    match tag {
        TAG_CLEAR => Ok((Op::Clear, offset)),
        TAG_PUT | TAG_DELETE => {
            let key = decode_slice(data, &mut offset, "key")?;
            if tag == TAG_DELETE {
                return Ok((Op::Delete { key }, offset));
            }
            let value = decode_slice(data, &mut offset, "value")?;
            Ok((Op::Put { key, value }, offset))
        }
        _ => Err(Error::Corruption(format!("invalid op tag: {}", tag))),
    }
}

fn decode_slice(data: &[u8], offset: &mut usize, what: &str) -> Result<Vec<u8>> {
    if data.len() < *offset + LEN_SIZE {
        return Err(Error::Corruption(format!("op truncated before {} length", what)));
    }
    let len =
        u32::from_le_bytes(data[*offset..*offset + LEN_SIZE].try_into().unwrap()) as usize;
    *offset += LEN_SIZE;

    if data.len() < *offset + len {
        return Err(Error::Corruption(format!("{} length exceeds record", what)));
    }
    let slice = data[*offset..*offset + len].to_vec();
    *offset += len;
    Ok(slice)
}
