use defmt::Format;

#[derive(Debug, Clone, PartialEq, Format)]
pub enum GnssError {
    NoFix,
    MissingField(&'static str), // Specify which field is missing
    UnsupportedSentence,        // Only GGA carries altitude
    InvalidUtf8,
    ParseError,
}
