//! A P-Data value writer.

use crate::pdu::PDataValueType;
use std::io::Write;

/// A writer which frames its bytes as presentation data values,
/// splitting them into P-DATA-TF PDUs
/// so that no PDU exceeds the negotiated maximum size.
///
/// The final fragment (with the last-fragment bit set) is emitted
/// when the writer is finished or dropped.
#[must_use]
pub struct PDataWriter<W: Write> {
    buffer: Vec<u8>,
    stream: W,
    presentation_context_id: u8,
    value_type: PDataValueType,
    max_data_length: u32,
    finished: bool,
}

/// The byte overhead of one PDV inside one PDU:
/// the 4-byte PDV length, the context id and the control header.
const PDV_OVERHEAD: u32 = 6;

impl<W> PDataWriter<W>
where
    W: Write,
{
    /// Construct a new P-Data value writer.
    ///
    /// `max_pdu_length` is the peer's limit on the PDU body.
    pub(crate) fn new(
        stream: W,
        presentation_context_id: u8,
        value_type: PDataValueType,
        max_pdu_length: u32,
    ) -> Self {
        let max_data_length = max_pdu_length - PDV_OVERHEAD;
        PDataWriter {
            stream,
            presentation_context_id,
            value_type,
            max_data_length,
            buffer: Vec::with_capacity(max_data_length as usize),
            finished: false,
        }
    }

    /// Send the header of a single P-Data PDU
    /// containing a single data fragment.
    fn send_pdata_header(&mut self, data_len: u32, is_last: bool) -> std::io::Result<()> {
        let mut message_header = match self.value_type {
            PDataValueType::Command => 0x01,
            PDataValueType::Data => 0x00,
        };
        if is_last {
            message_header |= 0x02;
        }

        let pdu_len_bytes = (data_len + PDV_OVERHEAD).to_be_bytes();
        let pdv_len_bytes = (data_len + 2).to_be_bytes();
        let header = [
            // PDU type + reserved byte
            0x04,
            0x00,
            // full PDU length
            pdu_len_bytes[0],
            pdu_len_bytes[1],
            pdu_len_bytes[2],
            pdu_len_bytes[3],
            // PDV length (data + context id + control header)
            pdv_len_bytes[0],
            pdv_len_bytes[1],
            pdv_len_bytes[2],
            pdv_len_bytes[3],
            self.presentation_context_id,
            message_header,
        ];

        self.stream.write_all(&header)
    }

    /// Flush out full PDUs while more than one maximum-size
    /// fragment is pending.
    fn dispatch_excess_data(&mut self) -> std::io::Result<()> {
        while self.buffer.len() > self.max_data_length as usize {
            self.send_pdata_header(self.max_data_length, false)?;
            let consumed = self.max_data_length as usize;
            {
                let data = &self.buffer[0..consumed];
                self.stream.write_all(data)?;
            }
            self.buffer.drain(0..consumed);
        }
        Ok(())
    }

    /// Send the remaining bytes as the final fragment
    /// and consume the writer.
    pub fn finish(mut self) -> std::io::Result<()> {
        self.finish_impl()
    }

    fn finish_impl(&mut self) -> std::io::Result<()> {
        if self.finished {
            return Ok(());
        }
        self.dispatch_excess_data()?;
        // the last fragment is always sent, even if empty
        self.send_pdata_header(self.buffer.len() as u32, true)?;
        self.stream.write_all(&self.buffer)?;
        self.buffer.clear();
        self.finished = true;
        self.stream.flush()
    }
}

impl<W> Write for PDataWriter<W>
where
    W: Write,
{
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        self.dispatch_excess_data()?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<W> Drop for PDataWriter<W>
where
    W: Write,
{
    fn drop(&mut self) {
        let _ = self.finish_impl();
    }
}

#[cfg(test)]
mod tests {
    use super::PDataWriter;
    use crate::pdu::reader::read_pdu;
    use crate::pdu::{PDataValueType, Pdu, MAXIMUM_PDU_SIZE, MINIMUM_PDU_SIZE};
    use std::io::Write;

    fn collect_pdus(bytes: &[u8]) -> Vec<Pdu> {
        let mut cursor = bytes;
        let mut out = vec![];
        loop {
            match read_pdu(&mut cursor, MAXIMUM_PDU_SIZE, true) {
                Ok(pdu) => out.push(pdu),
                Err(crate::pdu::reader::Error::NoPduAvailable { .. }) => break,
                Err(e) => panic!("unexpected error: {}", e),
            }
        }
        out
    }

    #[test]
    fn small_payload_is_one_final_pdu() {
        let mut out = Vec::new();
        {
            let mut writer =
                PDataWriter::new(&mut out, 1, PDataValueType::Command, MINIMUM_PDU_SIZE);
            writer.write_all(&[0xAA; 100]).unwrap();
            writer.finish().unwrap();
        }
        let pdus = collect_pdus(&out);
        assert_eq!(pdus.len(), 1);
        match &pdus[0] {
            Pdu::PData { data } => {
                assert_eq!(data.len(), 1);
                assert!(data[0].is_last);
                assert_eq!(data[0].value_type, PDataValueType::Command);
                assert_eq!(data[0].data.len(), 100);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn large_payload_is_split_under_the_limit() {
        let mut out = Vec::new();
        let payload = vec![0x42u8; MINIMUM_PDU_SIZE as usize * 2];
        {
            let mut writer =
                PDataWriter::new(&mut out, 3, PDataValueType::Data, MINIMUM_PDU_SIZE);
            writer.write_all(&payload).unwrap();
            writer.finish().unwrap();
        }
        let pdus = collect_pdus(&out);
        assert!(pdus.len() > 1);
        let mut total = 0;
        for (i, pdu) in pdus.iter().enumerate() {
            match pdu {
                Pdu::PData { data } => {
                    // no PDU body may exceed the negotiated maximum
                    assert!(data[0].data.len() + 6 <= MINIMUM_PDU_SIZE as usize);
                    assert_eq!(data[0].is_last, i == pdus.len() - 1);
                    total += data[0].data.len();
                }
                other => panic!("unexpected {:?}", other),
            }
        }
        assert_eq!(total, payload.len());
    }
}
