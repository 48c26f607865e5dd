use crate::error::{PanoError, Result};
use crate::types::{AlternateCapture, Coordinate, DatedPanorama, LookupResult, RawDate};
use chrono::NaiveDate;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::LazyLock;

/// Field that identifies the panorama in an alternate-capture record.
const PANO_KEY: &str = "pano";

/// Month labels considered winter imagery (leafless trees, clearer facades).
const WINTER_MONTHS: [&str; 6] = ["Nov", "Dec", "Jan", "Feb", "Mar", "Apr"];

// Matches "2019-03", "2019-03-01" and "2019-03-01T05:00:00.000Z"
static YEAR_MONTH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{1,2})(?:$|[-T])").expect("valid year-month regex"));

/// Format a capture date as "MMM YYYY", e.g. "Mar 2019".
pub fn capture_date_label(raw: &RawDate) -> Result<String> {
    let (year, month) = match raw {
        RawDate::Text(text) => parse_year_month(text)?,
        RawDate::Parts { year, month } => (*year, *month),
    };

    let date = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
        PanoError::MalformedMetadata(format!("invalid capture month {year}-{month}"))
    })?;
    Ok(date.format("%b %Y").to_string())
}

fn parse_year_month(text: &str) -> Result<(i32, u32)> {
    let caps = YEAR_MONTH_RE
        .captures(text.trim())
        .ok_or_else(|| PanoError::MalformedMetadata(format!("unrecognized capture date {text:?}")))?;

    let year = caps[1]
        .parse::<i32>()
        .map_err(|e| PanoError::MalformedMetadata(format!("bad year in {text:?}: {e}")))?;
    let month = caps[2]
        .parse::<u32>()
        .map_err(|e| PanoError::MalformedMetadata(format!("bad month in {text:?}: {e}")))?;
    Ok((year, month))
}

/// Return the name of the date field in an alternate-capture record.
///
/// Records carry exactly two fields: `pano` and one date whose key varies
/// between service versions. Anything else is rejected.
pub fn alternate_capture_date_key(record: &Map<String, Value>) -> Result<&str> {
    if record.len() != 2 {
        return Err(PanoError::MalformedMetadata(format!(
            "alternate capture has {} fields, expected 2",
            record.len()
        )));
    }
    if !record.get(PANO_KEY).is_some_and(Value::is_string) {
        return Err(PanoError::MalformedMetadata(
            "alternate capture has no string `pano` field".to_string(),
        ));
    }

    record
        .keys()
        .map(String::as_str)
        .find(|key| *key != PANO_KEY)
        .ok_or_else(|| PanoError::MalformedMetadata("alternate capture has no date field".to_string()))
}

/// Parse a loosely-typed sequence of alternate-capture records.
///
/// The date key is inferred from the first record and every other record
/// must use the same key.
pub fn alternate_captures_from_value(value: &Value) -> Result<Vec<AlternateCapture>> {
    let records = value
        .as_array()
        .ok_or_else(|| PanoError::MalformedMetadata("alternate captures are not a list".to_string()))?;

    let Some(first) = records.first() else {
        return Ok(Vec::new());
    };
    let key = alternate_capture_date_key(as_record(first)?)?.to_string();

    records
        .iter()
        .enumerate()
        .map(|(idx, entry)| {
            let record = as_record(entry)?;
            let date_key = alternate_capture_date_key(record)?;
            if date_key != key {
                return Err(PanoError::MalformedMetadata(format!(
                    "alternate capture {idx} uses date key {date_key:?}, expected {key:?}"
                )));
            }

            let panorama_id = record[PANO_KEY].as_str().unwrap_or_default().to_string();
            let capture_timestamp = serde_json::from_value(record[date_key].clone()).map_err(|e| {
                PanoError::MalformedMetadata(format!("alternate capture {idx} date: {e}"))
            })?;

            Ok(AlternateCapture {
                panorama_id,
                capture_timestamp,
            })
        })
        .collect()
}

fn as_record(value: &Value) -> Result<&Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| PanoError::MalformedMetadata("alternate capture is not an object".to_string()))
}

/// Pair each alternate capture with its formatted date, keeping input order.
pub fn other_panoramas_with_dates(captures: &[AlternateCapture]) -> Result<Vec<DatedPanorama>> {
    captures
        .iter()
        .map(|capture| {
            Ok(DatedPanorama {
                pano: capture.panorama_id.clone(),
                date: capture_date_label(&capture.capture_timestamp)?,
            })
        })
        .collect()
}

/// Build a [`LookupResult`] from a JavaScript-API style panorama payload.
///
/// Expected shape:
///
/// ```json
/// {
///   "location": { "pano": "abc", "latLng": { "lat": 48.85, "lng": 2.35 } },
///   "imageDate": "2019-03",
///   "time": [ { "pano": "old", "Gm": "2015-06-01T04:00:00.000Z" } ]
/// }
/// ```
pub fn lookup_result_from_payload(payload: &Value) -> Result<LookupResult> {
    let location = payload
        .get("location")
        .ok_or_else(|| PanoError::InvalidResponse("payload has no location".to_string()))?;

    let panorama_id = location
        .get(PANO_KEY)
        .and_then(Value::as_str)
        .ok_or_else(|| PanoError::InvalidResponse("location has no pano id".to_string()))?
        .to_string();

    let lat_lng = location
        .get("latLng")
        .ok_or_else(|| PanoError::InvalidResponse("location has no latLng".to_string()))?;
    let panorama_position: Coordinate = serde_json::from_value(lat_lng.clone())
        .map_err(|e| PanoError::ParseError(format!("latLng: {e}")))?;

    let capture_date: RawDate = payload
        .get("imageDate")
        .cloned()
        .map(serde_json::from_value::<RawDate>)
        .transpose()
        .map_err(|e| PanoError::MalformedMetadata(format!("imageDate: {e}")))?
        .ok_or_else(|| PanoError::MalformedMetadata("payload has no imageDate".to_string()))?;

    // The displayed capture is listed among the others; keep only the others
    let alternate_captures = match payload.get("time") {
        Some(time) => alternate_captures_from_value(time)?
            .into_iter()
            .filter(|capture| capture.panorama_id != panorama_id)
            .collect(),
        None => Vec::new(),
    };

    Ok(LookupResult {
        panorama_id,
        panorama_position,
        capture_date,
        alternate_captures,
    })
}

/// Choose at most one extra capture to visit, preferring winter months.
///
/// Captures are listed oldest first, so the scan runs from the most recent.
/// Anything already in `picked` is skipped and the chosen pano is added to it.
pub fn select_one_winter_month(
    dates: &[DatedPanorama],
    picked: &mut HashSet<String>,
) -> Vec<DatedPanorama> {
    let choice = dates
        .iter()
        .rev()
        .find(|d| is_winter(d) && !picked.contains(&d.pano))
        .or_else(|| dates.iter().rev().find(|d| !picked.contains(&d.pano)));

    match choice {
        Some(d) => {
            picked.insert(d.pano.clone());
            vec![d.clone()]
        }
        None => Vec::new(),
    }
}

fn is_winter(d: &DatedPanorama) -> bool {
    d.date
        .split(' ')
        .next()
        .is_some_and(|month| WINTER_MONTHS.contains(&month))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dated(pano: &str, date: &str) -> DatedPanorama {
        DatedPanorama {
            pano: pano.to_string(),
            date: date.to_string(),
        }
    }

    #[test]
    fn test_capture_date_label_formats() {
        assert_eq!(capture_date_label(&RawDate::Text("2019-03".into())).unwrap(), "Mar 2019");
        assert_eq!(capture_date_label(&RawDate::Text("2020-7".into())).unwrap(), "Jul 2020");
        assert_eq!(
            capture_date_label(&RawDate::Text("2015-06-01T04:00:00.000Z".into())).unwrap(),
            "Jun 2015"
        );
        assert_eq!(capture_date_label(&RawDate::year_month(2021, 12)).unwrap(), "Dec 2021");
    }

    #[test]
    fn test_capture_date_label_rejects_garbage() {
        assert!(matches!(
            capture_date_label(&RawDate::Text("March".into())),
            Err(PanoError::MalformedMetadata(_))
        ));
        assert!(matches!(
            capture_date_label(&RawDate::year_month(2021, 13)),
            Err(PanoError::MalformedMetadata(_))
        ));
        assert!(capture_date_label(&RawDate::Text("2019-031".into())).is_err());
    }

    #[test]
    fn test_date_key_inferred() {
        let record = json!({"pano": "A", "Gm": "2019-03"});
        assert_eq!(alternate_capture_date_key(record.as_object().unwrap()).unwrap(), "Gm");
    }

    #[test]
    fn test_date_key_rejects_wrong_field_count() {
        let record = json!({"pano": "A", "Gm": "2019-03", "extra": 1});
        assert!(alternate_capture_date_key(record.as_object().unwrap()).is_err());

        let record = json!({"pano": "A"});
        assert!(alternate_capture_date_key(record.as_object().unwrap()).is_err());

        let record = json!({"id": "A", "Gm": "2019-03"});
        assert!(alternate_capture_date_key(record.as_object().unwrap()).is_err());
    }

    #[test]
    fn test_other_panoramas_keep_order() {
        let time = json!([
            {"pano": "A", "Gm": "2019-03"},
            {"pano": "B", "Gm": "2020-07"},
        ]);
        let captures = alternate_captures_from_value(&time).unwrap();
        let dated = other_panoramas_with_dates(&captures).unwrap();

        assert_eq!(dated.len(), 2);
        assert_eq!(dated[0].pano, "A");
        assert_eq!(dated[0].date, "Mar 2019");
        assert_eq!(dated[1].pano, "B");
        assert_eq!(dated[1].date, "Jul 2020");
    }

    #[test]
    fn test_mixed_date_keys_are_rejected() {
        let time = json!([
            {"pano": "A", "Gm": "2019-03"},
            {"pano": "B", "Hn": "2020-07"},
        ]);
        assert!(matches!(
            alternate_captures_from_value(&time),
            Err(PanoError::MalformedMetadata(_))
        ));
    }

    #[test]
    fn test_empty_time_list() {
        assert!(alternate_captures_from_value(&json!([])).unwrap().is_empty());
    }

    #[test]
    fn test_lookup_result_from_payload() {
        let payload = json!({
            "location": {"pano": "main", "latLng": {"lat": 48.8501, "lng": 2.3502}},
            "imageDate": "2019-03",
            "time": [
                {"pano": "old", "Gm": "2015-06-01T04:00:00.000Z"},
                {"pano": "main", "Gm": {"year": 2019, "month": 3}},
            ]
        });
        let result = lookup_result_from_payload(&payload).unwrap();

        assert_eq!(result.panorama_id, "main");
        assert!((result.panorama_position.lat - 48.8501).abs() < 1e-12);
        assert_eq!(result.capture_date, RawDate::Text("2019-03".into()));
        assert_eq!(
            result.alternate_captures,
            vec![AlternateCapture {
                panorama_id: "old".to_string(),
                capture_timestamp: RawDate::Text("2015-06-01T04:00:00.000Z".into()),
            }]
        );
    }

    #[test]
    fn test_payload_still_validates_the_displayed_capture() {
        // The current pano is dropped from the result, but a malformed record
        // for it is still an error
        let payload = json!({
            "location": {"pano": "main", "latLng": {"lat": 48.8501, "lng": 2.3502}},
            "imageDate": "2019-03",
            "time": [
                {"pano": "old", "Gm": "2015-06"},
                {"pano": "main", "Gm": "2019-03", "extra": true},
            ]
        });
        assert!(matches!(
            lookup_result_from_payload(&payload),
            Err(PanoError::MalformedMetadata(_))
        ));
    }

    #[test]
    fn test_lookup_result_without_location() {
        assert!(matches!(
            lookup_result_from_payload(&json!({"imageDate": "2019-03"})),
            Err(PanoError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_select_prefers_recent_winter() {
        let dates = vec![
            dated("p1", "Jan 2010"),
            dated("p2", "Dec 2014"),
            dated("p3", "Jul 2019"),
        ];
        let mut picked = HashSet::from(["current".to_string()]);

        let chosen = select_one_winter_month(&dates, &mut picked);
        assert_eq!(chosen, vec![dated("p2", "Dec 2014")]);
        assert!(picked.contains("p2"));
    }

    #[test]
    fn test_select_falls_back_to_most_recent() {
        let dates = vec![dated("p1", "Jun 2010"), dated("p2", "Aug 2016")];
        let mut picked = HashSet::new();

        assert_eq!(select_one_winter_month(&dates, &mut picked), vec![dated("p2", "Aug 2016")]);
    }

    #[test]
    fn test_select_skips_already_picked() {
        let dates = vec![dated("p1", "Jan 2010")];
        let mut picked = HashSet::from(["p1".to_string()]);

        assert!(select_one_winter_month(&dates, &mut picked).is_empty());
    }
}
