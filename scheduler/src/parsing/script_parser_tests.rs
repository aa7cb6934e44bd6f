#[cfg(test)]
mod tests {
    use crate::models::Filter;
    use crate::parsing::script_parser::{parse_script, parse_script_str};
    use approx::assert_relative_eq;
    use qtty::{Degree, Second};
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_bare_array() {
        let json = r#"[
            {"ra": 150.1, "dec": 2.18, "filter": "r", "mjd": 60000.1, "note": "DD:COSMOS"},
            {"ra": 53.125, "dec": -28.1, "filter": "g", "mjd": 60000.2, "exptime": 15, "nexp": 1}
        ]"#;

        let observations = parse_script_str(json).unwrap();
        assert_eq!(observations.len(), 2);
        assert_eq!(observations[0].filter, Filter::R);
        assert_eq!(observations[0].note, "DD:COSMOS");
        assert_relative_eq!(observations[0].ra.to::<Degree>().value(), 150.1, epsilon = 1e-9);
        assert_eq!(observations[1].nexp, 1);
        assert_eq!(observations[1].exptime.to::<Second>().value(), 15.0);
        assert_eq!(observations[1].note, "");
    }

    #[test]
    fn test_parse_wrapped_with_utc_time() {
        let json = r#"{
            "observations": [
                {"ra": 10.0, "dec": -20.0, "filter": "i", "time": "2023-02-25T00:00:00Z", "field_id": "1234"}
            ]
        }"#;

        let observations = parse_script_str(json).unwrap();
        assert_eq!(observations.len(), 1);
        assert_relative_eq!(observations[0].mjd.value(), 60000.0, epsilon = 1e-9);
        assert_eq!(observations[0].field_id, Some(1234));
    }

    #[test]
    fn test_entries_are_sorted_by_epoch() {
        let json = r#"[
            {"ra": 1.0, "dec": 0.0, "filter": "r", "mjd": 60000.3},
            {"ra": 2.0, "dec": 0.0, "filter": "r", "mjd": 60000.1},
            {"ra": 3.0, "dec": 0.0, "filter": "r", "mjd": 60000.2}
        ]"#;

        let observations = parse_script_str(json).unwrap();
        let epochs: Vec<f64> = observations.iter().map(|o| o.mjd.value()).collect();
        assert_eq!(epochs, vec![60000.1, 60000.2, 60000.3]);
    }

    #[test]
    fn test_bad_filter_reports_path() {
        let json = r#"[
            {"ra": 1.0, "dec": 0.0, "filter": "r", "mjd": 60000.1},
            {"ra": 1.0, "dec": 0.0, "filter": "q", "mjd": 60000.1}
        ]"#;

        let err = parse_script_str(json).unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("[1].filter"), "unexpected error: {}", message);
    }

    #[test]
    fn test_epoch_is_required_once() {
        let missing = r#"[{"ra": 1.0, "dec": 0.0, "filter": "r"}]"#;
        assert!(parse_script_str(missing).is_err());

        let both = r#"[{"ra": 1.0, "dec": 0.0, "filter": "r", "mjd": 60000.0, "time": "2023-02-25T00:00:00Z"}]"#;
        assert!(parse_script_str(both).is_err());
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(parse_script_str("not json").is_err());
        assert!(parse_script_str(r#"{"visits": []}"#).is_err());
        assert!(parse_script_str(r#"[{"ra": 1.0, "dec": 95.0, "filter": "r", "mjd": 1.0}]"#).is_err());
        assert!(parse_script_str(r#"[{"ra": 1.0, "dec": 0.0, "filter": "r", "mjd": 1.0, "priority": 3}]"#).is_err());
    }

    #[test]
    fn test_empty_script() {
        assert!(parse_script_str("[]").unwrap().is_empty());
        assert!(parse_script_str(r#"{"observations": []}"#).unwrap().is_empty());
    }

    #[test]
    fn test_parse_script_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"[{{"ra": 370.0, "dec": -45.0, "filter": "z", "mjd": 60001.5}}]"#).unwrap();

        let observations = parse_script(file.path()).unwrap();
        assert_eq!(observations.len(), 1);
        // Right ascension is wrapped into [0, 360)
        assert_relative_eq!(observations[0].ra.to::<Degree>().value(), 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_missing_file() {
        let err = parse_script(std::path::Path::new("/nonexistent/script.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read script file"));
    }
}
