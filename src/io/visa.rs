//! VISA-backed transport, available with the `hardware` feature.

use std::ffi::CString;
use std::io::{BufRead, BufReader, Read, Write};

use visa_rs::enums::attribute::AttrTmoValue;
use visa_rs::prelude::*;
use visa_rs::vs;

use crate::{Error, Result};
use super::Transport;

fn visa_error(error: visa_rs::Error) -> Error {
    Error::Other(error.into())
}

/// One open VISA session, e.g. `GPIB0::25::INSTR`.
///
/// The session I/O timeout is disabled: parameter analyzer sweeps hold the
/// bus for however long the sweep takes.
pub struct VisaTransport {
    // one reader for the whole session, so bytes buffered past a reply
    // terminator survive until the next query
    instr: BufReader<Instrument>,
}

impl VisaTransport {
    pub fn open(resource: &str) -> Result<VisaTransport> {
        let rm = DefaultRM::new().map_err(visa_error)?;
        let name = CString::new(resource).map_err(|error| Error::Other(error.into()))?;
        let rsc = rm.find_res(&name.into()).map_err(visa_error)?;
        let instr = rm
            .open(&rsc, AccessMode::NO_LOCK, TIMEOUT_IMMEDIATE)
            .map_err(visa_error)?;
        // the open timeout above only governs session establishment; reads
        // and writes follow VI_ATTR_TMO_VALUE, which must be off
        let timeout = AttrTmoValue::new_checked(vs::VI_TMO_INFINITE as _)
            .ok_or_else(|| Error::Other("infinite timeout not representable".into()))?;
        instr.set_attr(timeout.into()).map_err(visa_error)?;
        log::debug!("opened {}", resource);
        Ok(VisaTransport { instr: BufReader::new(instr) })
    }
}

impl Transport for VisaTransport {
    fn write(&mut self, cmd: &str) -> Result<()> {
        log::debug!("write({:?})", cmd);
        let instr = self.instr.get_mut();
        instr.write_all(cmd.as_bytes())?;
        instr.write_all(b"\n")?;
        Ok(())
    }

    fn query(&mut self, cmd: &str) -> Result<String> {
        self.write(cmd)?;
        let mut line = Vec::new();
        self.instr.read_until(b'\n', &mut line)?;
        while line.last() == Some(&b'\n') || line.last() == Some(&b'\r') {
            line.pop();
        }
        let reply = String::from_utf8(line)
            .map_err(|error| Error::Parse(error.to_string()))?;
        log::debug!("query({:?}) = {:?}", cmd, reply);
        Ok(reply)
    }

    fn query_block(&mut self, cmd: &str) -> Result<Vec<u8>> {
        self.write(cmd)?;
        // the whole message is one reply; block framing is parsed by the
        // caller
        let mut framed = Vec::new();
        self.instr.read_to_end(&mut framed)?;
        log::debug!("query_block({:?}) = {} bytes", cmd, framed.len());
        Ok(framed)
    }
}
