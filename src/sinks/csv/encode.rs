use csv::ByteRecord;
use itoa::Buffer as ItoaBuffer;
use ryu::Buffer as RyuBuffer;

use crate::value::{Payload, TypedValue};

/// Renders one typed value into `out`; system-missing cells stay empty and
/// user-missing cells are written as their value.
pub fn encode_value(
    value: &TypedValue<'_>,
    out: &mut Vec<u8>,
    ryu: &mut RyuBuffer,
    itoa: &mut ItoaBuffer,
) {
    out.clear();
    match &value.payload {
        Payload::Empty => {}
        Payload::Double(v) => out.extend_from_slice(ryu.format(*v).as_bytes()),
        Payload::Int32(v) => out.extend_from_slice(itoa.format(*v).as_bytes()),
        Payload::Str(s) => out.extend_from_slice(s.as_bytes()),
    }
}

pub fn fill_record(record: &mut ByteRecord, scratch: &[Vec<u8>]) {
    record.clear();
    for field in scratch {
        record.push_field(field);
    }
}
