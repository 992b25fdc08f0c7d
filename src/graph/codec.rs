//! Binary packing in the ledger's native layout
//!
//! Integers are little-endian, lengths and variant discriminants are
//! LEB128 `varuint32`, names and symbols travel as packed `u64`.

use super::content::{ContentGroup, ContentItem};
use super::types::{Asset, Checksum256, Name, Symbol, TimePoint};
use super::value::FlexValue;
use crate::error::{DocGraphError, DocGraphResult};
use bytes::{Buf, BufMut};

/// Types with a binary encoding
pub trait Pack {
    fn pack<B: BufMut>(&self, buf: &mut B);

    fn to_packed(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.pack(&mut buf);
        buf
    }
}

/// Types decodable from their binary encoding
pub trait Unpack: Sized {
    fn unpack<B: Buf>(buf: &mut B) -> DocGraphResult<Self>;

    /// Decode a complete buffer, rejecting trailing bytes
    fn from_packed(data: &[u8]) -> DocGraphResult<Self> {
        let mut buf = data;
        let value = Self::unpack(&mut buf)?;
        if buf.has_remaining() {
            return Err(DocGraphError::Codec(format!(
                "{} trailing bytes after value",
                buf.remaining()
            )));
        }
        Ok(value)
    }
}

fn ensure<B: Buf>(buf: &B, needed: usize) -> DocGraphResult<()> {
    if buf.remaining() < needed {
        return Err(DocGraphError::Codec(format!(
            "unexpected end of input: need {} bytes, have {}",
            needed,
            buf.remaining()
        )));
    }
    Ok(())
}

pub fn write_varuint32<B: BufMut>(buf: &mut B, mut value: u32) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            buf.put_u8(byte);
            return;
        }
        buf.put_u8(byte | 0x80);
    }
}

pub fn read_varuint32<B: Buf>(buf: &mut B) -> DocGraphResult<u32> {
    let mut value: u64 = 0;
    for shift in (0..35).step_by(7) {
        ensure(buf, 1)?;
        let byte = buf.get_u8();
        value |= ((byte & 0x7f) as u64) << shift;
        if byte & 0x80 == 0 {
            return u32::try_from(value)
                .map_err(|_| DocGraphError::Codec("varuint32 overflow".to_string()));
        }
    }
    Err(DocGraphError::Codec("varuint32 longer than 5 bytes".to_string()))
}

impl Pack for i64 {
    fn pack<B: BufMut>(&self, buf: &mut B) {
        buf.put_i64_le(*self);
    }
}

impl Unpack for i64 {
    fn unpack<B: Buf>(buf: &mut B) -> DocGraphResult<Self> {
        ensure(buf, 8)?;
        Ok(buf.get_i64_le())
    }
}

impl Pack for String {
    fn pack<B: BufMut>(&self, buf: &mut B) {
        write_varuint32(buf, self.len() as u32);
        buf.put_slice(self.as_bytes());
    }
}

impl Unpack for String {
    fn unpack<B: Buf>(buf: &mut B) -> DocGraphResult<Self> {
        let len = read_varuint32(buf)? as usize;
        ensure(buf, len)?;
        let mut bytes = vec![0u8; len];
        buf.copy_to_slice(&mut bytes);
        String::from_utf8(bytes).map_err(|e| DocGraphError::Codec(e.to_string()))
    }
}

impl Pack for Name {
    fn pack<B: BufMut>(&self, buf: &mut B) {
        buf.put_u64_le(self.to_u64());
    }
}

impl Unpack for Name {
    fn unpack<B: Buf>(buf: &mut B) -> DocGraphResult<Self> {
        ensure(buf, 8)?;
        Ok(Name::from_u64(buf.get_u64_le()))
    }
}

impl Pack for Checksum256 {
    fn pack<B: BufMut>(&self, buf: &mut B) {
        buf.put_slice(self.as_bytes());
    }
}

impl Unpack for Checksum256 {
    fn unpack<B: Buf>(buf: &mut B) -> DocGraphResult<Self> {
        ensure(buf, 32)?;
        let mut bytes = [0u8; 32];
        buf.copy_to_slice(&mut bytes);
        Ok(Checksum256::new(bytes))
    }
}

impl Pack for Asset {
    fn pack<B: BufMut>(&self, buf: &mut B) {
        buf.put_i64_le(self.amount);
        buf.put_u64_le(self.symbol.to_u64());
    }
}

impl Unpack for Asset {
    fn unpack<B: Buf>(buf: &mut B) -> DocGraphResult<Self> {
        ensure(buf, 16)?;
        let amount = buf.get_i64_le();
        let symbol = Symbol::from_u64(buf.get_u64_le())?;
        Ok(Asset::new(amount, symbol))
    }
}

impl Pack for TimePoint {
    fn pack<B: BufMut>(&self, buf: &mut B) {
        buf.put_i64_le(self.as_micros());
    }
}

impl Unpack for TimePoint {
    fn unpack<B: Buf>(buf: &mut B) -> DocGraphResult<Self> {
        Ok(TimePoint::from_micros(i64::unpack(buf)?))
    }
}

impl Pack for FlexValue {
    fn pack<B: BufMut>(&self, buf: &mut B) {
        write_varuint32(buf, self.discriminant());
        match self {
            FlexValue::Monostate => {}
            FlexValue::Name(name) => name.pack(buf),
            FlexValue::String(text) => text.pack(buf),
            FlexValue::Asset(asset) => asset.pack(buf),
            FlexValue::TimePoint(tp) => tp.pack(buf),
            FlexValue::Int64(v) => v.pack(buf),
            FlexValue::Checksum256(hash) => hash.pack(buf),
        }
    }
}

impl Unpack for FlexValue {
    fn unpack<B: Buf>(buf: &mut B) -> DocGraphResult<Self> {
        let variant = FlexValue::variant(read_varuint32(buf)?)?;
        let value = match (variant.zero)() {
            FlexValue::Monostate => FlexValue::Monostate,
            FlexValue::Name(_) => FlexValue::Name(Name::unpack(buf)?),
            FlexValue::String(_) => FlexValue::String(String::unpack(buf)?),
            FlexValue::Asset(_) => FlexValue::Asset(Asset::unpack(buf)?),
            FlexValue::TimePoint(_) => FlexValue::TimePoint(TimePoint::unpack(buf)?),
            FlexValue::Int64(_) => FlexValue::Int64(i64::unpack(buf)?),
            FlexValue::Checksum256(_) => FlexValue::Checksum256(Checksum256::unpack(buf)?),
        };
        Ok(value)
    }
}

impl Pack for ContentItem {
    fn pack<B: BufMut>(&self, buf: &mut B) {
        self.label.pack(buf);
        self.value.pack(buf);
    }
}

impl Unpack for ContentItem {
    fn unpack<B: Buf>(buf: &mut B) -> DocGraphResult<Self> {
        let label = String::unpack(buf)?;
        let value = FlexValue::unpack(buf)?;
        Ok(ContentItem { label, value })
    }
}

impl Pack for ContentGroup {
    fn pack<B: BufMut>(&self, buf: &mut B) {
        write_varuint32(buf, self.len() as u32);
        for item in self.items() {
            item.pack(buf);
        }
    }
}

impl Unpack for ContentGroup {
    fn unpack<B: Buf>(buf: &mut B) -> DocGraphResult<Self> {
        Ok(ContentGroup::from(Vec::<ContentItem>::unpack(buf)?))
    }
}

impl<T: Pack> Pack for Vec<T> {
    fn pack<B: BufMut>(&self, buf: &mut B) {
        write_varuint32(buf, self.len() as u32);
        for item in self {
            item.pack(buf);
        }
    }
}

impl<T: Unpack> Unpack for Vec<T> {
    fn unpack<B: Buf>(buf: &mut B) -> DocGraphResult<Self> {
        let count = read_varuint32(buf)? as usize;
        // every element takes at least one byte
        ensure(buf, count)?;
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            items.push(T::unpack(buf)?);
        }
        Ok(items)
    }
}
