use defmt::Format;

/// Failure of a single modem operation.
#[derive(Debug, Clone, PartialEq, Format)]
pub enum ModemError {
    /// The byte transport itself failed
    Io(#[defmt(Debug2Format)] embedded_io::ErrorKind),
    /// No complete response before the deadline
    Timeout,
    /// The modem answered `ERROR` / `+CMS ERROR`
    Rejected,
    /// The response did not have the expected shape
    Malformed,
    /// A field did not fit its fixed-capacity buffer
    Overflow,
}

impl ModemError {
    pub(crate) fn io<E: embedded_io::Error>(e: E) -> Self {
        ModemError::Io(e.kind())
    }
}
