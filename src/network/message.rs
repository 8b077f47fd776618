use crate::core::{Block, Transaction, BLOCK_HEADER_LEN, TRANSACTION_LEN};
use crate::error::{BlockchainError, Result};
use crate::utils::{check_digit_width, decode_digits, encode_digits, FIELD_LEN};
use std::fmt;

/// Leading tag byte of a wire frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Transaction,
    Close,
    Block,
    GetBlock,
}

impl Opcode {
    /// Accepts the ASCII digits '0'..'3' that nodes write, as well as the raw
    /// values 0..3.
    pub fn from_byte(byte: u8) -> Result<Opcode> {
        match byte {
            b'0' | 0 => Ok(Opcode::Transaction),
            b'1' | 1 => Ok(Opcode::Close),
            b'2' | 2 => Ok(Opcode::Block),
            b'3' | 3 => Ok(Opcode::GetBlock),
            other => Err(BlockchainError::Format(format!(
                "unknown opcode byte 0x{other:02x}"
            ))),
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            Opcode::Transaction => b'0',
            Opcode::Close => b'1',
            Opcode::Block => b'2',
            Opcode::GetBlock => b'3',
        }
    }

    /// Payload size that follows the tag byte
    pub fn payload_len(self, tx_per_block: usize) -> usize {
        match self {
            Opcode::Transaction => TRANSACTION_LEN,
            Opcode::Close => 0,
            Opcode::Block => TRANSACTION_LEN
                .saturating_mul(tx_per_block)
                .saturating_add(BLOCK_HEADER_LEN),
            Opcode::GetBlock => FIELD_LEN,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Opcode::Transaction => "transaction",
            Opcode::Close => "close",
            Opcode::Block => "block",
            Opcode::GetBlock => "get-block",
        };
        f.write_str(name)
    }
}

/// One complete wire frame: the tag byte followed by its payload, kept
/// verbatim so it can be forwarded to peers untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    opcode: Opcode,
    bytes: Vec<u8>,
}

impl Frame {
    pub fn new(opcode: Opcode, payload: &[u8]) -> Frame {
        let mut bytes = Vec::with_capacity(1 + payload.len());
        bytes.push(opcode.as_byte());
        bytes.extend_from_slice(payload);
        Frame { opcode, bytes }
    }

    /// Wrap bytes read off the wire; `bytes[0]` is the tag byte of `opcode`
    pub(crate) fn from_wire(opcode: Opcode, bytes: Vec<u8>) -> Frame {
        Frame { opcode, bytes }
    }

    pub fn transaction(tx: &Transaction) -> Frame {
        Frame::new(Opcode::Transaction, &tx.serialize())
    }

    pub fn block(block: &Block) -> Frame {
        Frame::new(Opcode::Block, &block.serialize())
    }

    pub fn close() -> Frame {
        Frame::new(Opcode::Close, &[])
    }

    pub fn get_block(height: u128) -> Result<Frame> {
        let height = check_digit_width(height)?;
        Ok(Frame::new(Opcode::GetBlock, &encode_digits(height)))
    }

    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub fn payload(&self) -> &[u8] {
        &self.bytes[1..]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn decode(&self, tx_per_block: usize) -> Result<Message> {
        Message::decode(self.opcode, self.payload(), tx_per_block)
    }
}

/// A decoded frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Transaction(Transaction),
    Close,
    Block(Block),
    GetBlock(u128),
}

impl Message {
    pub fn decode(opcode: Opcode, payload: &[u8], tx_per_block: usize) -> Result<Message> {
        let expected = opcode.payload_len(tx_per_block);
        if payload.len() != expected {
            return Err(BlockchainError::Format(format!(
                "{opcode} payload must be {expected} bytes, got {}",
                payload.len()
            )));
        }
        match opcode {
            Opcode::Transaction => Ok(Message::Transaction(Transaction::deserialize(payload)?)),
            Opcode::Close => Ok(Message::Close),
            Opcode::Block => Ok(Message::Block(Block::deserialize(payload)?)),
            Opcode::GetBlock => Ok(Message::GetBlock(decode_digits(payload)?)),
        }
    }

    pub fn opcode(&self) -> Opcode {
        match self {
            Message::Transaction(_) => Opcode::Transaction,
            Message::Close => Opcode::Close,
            Message::Block(_) => Opcode::Block,
            Message::GetBlock(_) => Opcode::GetBlock,
        }
    }
}
