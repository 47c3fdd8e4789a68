//! Document payload submitted to the endpoint.
//!
//! Field names follow the endpoint's JSON contract, which mixes snake_case
//! with a couple of camelCase keys. Dates are `yyyy-MM-dd`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A document creation request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub description: Option<Description>,
    pub doc_id: String,
    pub doc_status: String,
    pub doc_type: String,
    #[serde(rename = "importRequest")]
    pub import_request: bool,
    pub owner_inn: String,
    pub participant_inn: String,
    pub producer_inn: String,
    pub production_date: Option<NaiveDate>,
    pub production_type: String,
    #[serde(default)]
    pub products: Vec<Product>,
    pub reg_date: Option<NaiveDate>,
    pub reg_number: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Description {
    #[serde(rename = "participantInn")]
    pub participant_inn: String,
}

/// A single product line within a document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub certificate_document: String,
    pub certificate_document_date: Option<NaiveDate>,
    pub certificate_document_number: String,
    pub owner_inn: String,
    pub producer_inn: String,
    pub production_date: Option<NaiveDate>,
    pub owned_code: String,
    pub uit_code: String,
    pub unit_code: String,
}

impl Document {
    /// Serialize to the JSON body the endpoint expects.
    pub fn to_payload(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn sample() -> Document {
        Document {
            description: Some(Description {
                participant_inn: "7701234567".to_string(),
            }),
            doc_id: "doc-1".to_string(),
            doc_status: "NEW".to_string(),
            doc_type: "LP_INTRODUCE_GOODS".to_string(),
            import_request: true,
            owner_inn: "7701234567".to_string(),
            participant_inn: "7701234567".to_string(),
            producer_inn: "7707654321".to_string(),
            production_date: NaiveDate::from_ymd_opt(2020, 1, 23),
            production_type: "OWN_PRODUCTION".to_string(),
            products: vec![Product {
                certificate_document: "CONFORMITY_CERTIFICATE".to_string(),
                certificate_document_date: NaiveDate::from_ymd_opt(2019, 12, 1),
                certificate_document_number: "RU-123".to_string(),
                owner_inn: "7701234567".to_string(),
                producer_inn: "7707654321".to_string(),
                production_date: NaiveDate::from_ymd_opt(2020, 1, 23),
                owned_code: "6401".to_string(),
                uit_code: "010460043993125621JgXJ5.T".to_string(),
                unit_code: "".to_string(),
            }],
            reg_date: NaiveDate::from_ymd_opt(2020, 1, 24),
            reg_number: "R-77".to_string(),
        }
    }

    #[test]
    fn test_wire_field_names() {
        let value: Value = serde_json::from_slice(&sample().to_payload().unwrap()).unwrap();

        assert_eq!(value["description"]["participantInn"], "7701234567");
        assert_eq!(value["importRequest"], true);
        assert_eq!(value["doc_type"], "LP_INTRODUCE_GOODS");
        assert_eq!(value["reg_number"], "R-77");
        assert_eq!(value["products"][0]["uit_code"], "010460043993125621JgXJ5.T");
        assert_eq!(value["products"][0]["owned_code"], "6401");
        assert!(value.get("import_request").is_none());
    }

    #[test]
    fn test_dates_use_iso_calendar_format() {
        let value: Value = serde_json::from_slice(&sample().to_payload().unwrap()).unwrap();

        assert_eq!(value["production_date"], "2020-01-23");
        assert_eq!(value["reg_date"], "2020-01-24");
        assert_eq!(value["products"][0]["certificate_document_date"], "2019-12-01");
    }

    #[test]
    fn test_parse_document_without_products() {
        let json = r#"{
            "description": null,
            "doc_id": "x",
            "doc_status": "NEW",
            "doc_type": "LP_INTRODUCE_GOODS",
            "importRequest": false,
            "owner_inn": "1",
            "participant_inn": "2",
            "producer_inn": "3",
            "production_date": "2021-05-06",
            "production_type": "OWN_PRODUCTION",
            "reg_date": null,
            "reg_number": ""
        }"#;

        let document: Document = serde_json::from_str(json).unwrap();

        assert!(document.products.is_empty());
        assert_eq!(document.production_date, NaiveDate::from_ymd_opt(2021, 5, 6));
        assert_eq!(document.reg_date, None);
    }
}
