use crate::fix::Fix;
use crate::gnss::error::GnssError;
use nmea::sentences::FixType;
use nmea::ParseResult;

impl TryFrom<ParseResult> for Fix {
    type Error = GnssError;

    fn try_from(data: ParseResult) -> Result<Self, Self::Error> {
        // GGA is the only sentence that carries altitude
        let gga = if let ParseResult::GGA(gga) = data {
            gga
        } else {
            return Err(GnssError::UnsupportedSentence);
        };

        match gga.fix_type {
            None | Some(FixType::Invalid) => return Err(GnssError::NoFix),
            Some(_) => {}
        }

        let latitude = gga
            .latitude
            .ok_or_else(|| GnssError::MissingField("latitude"))?;
        let longitude = gga
            .longitude
            .ok_or_else(|| GnssError::MissingField("longitude"))?;
        let altitude = gga
            .altitude
            .ok_or_else(|| GnssError::MissingField("altitude"))?;

        Ok(Fix {
            valid: true,
            latitude,
            longitude,
            altitude,
            time: gga.fix_time,
        })
    }
}
