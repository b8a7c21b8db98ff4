//! Route 53 XML wire types
//!
//! Only the elements this provider reads or writes are modelled; unknown
//! elements in responses are ignored.

use dyndns_core::traits::{ChangeBatch, RecordSet};
use serde::{Deserialize, Serialize};

/// XML namespace of the 2013-04-01 API
pub const NAMESPACE: &str = "https://route53.amazonaws.com/doc/2013-04-01/";

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

// ============ Requests ============

#[derive(Debug, Serialize)]
#[serde(rename = "ChangeResourceRecordSetsRequest")]
pub struct ChangeResourceRecordSetsRequest {
    #[serde(rename = "@xmlns")]
    xmlns: &'static str,
    #[serde(rename = "ChangeBatch")]
    change_batch: ChangeBatchXml,
}

#[derive(Debug, Serialize)]
struct ChangeBatchXml {
    #[serde(rename = "Comment")]
    comment: String,
    #[serde(rename = "Changes")]
    changes: ChangesXml,
}

#[derive(Debug, Serialize)]
struct ChangesXml {
    #[serde(rename = "Change")]
    change: Vec<ChangeXml>,
}

#[derive(Debug, Serialize)]
struct ChangeXml {
    #[serde(rename = "Action")]
    action: &'static str,
    #[serde(rename = "ResourceRecordSet")]
    record_set: ResourceRecordSetXml,
}

#[derive(Debug, Serialize)]
struct ResourceRecordSetXml {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Type")]
    record_type: &'static str,
    #[serde(rename = "TTL")]
    ttl: u32,
    #[serde(rename = "ResourceRecords")]
    records: ResourceRecordsOut,
}

#[derive(Debug, Serialize)]
struct ResourceRecordsOut {
    #[serde(rename = "ResourceRecord")]
    record: Vec<ResourceRecordOut>,
}

#[derive(Debug, Serialize)]
struct ResourceRecordOut {
    #[serde(rename = "Value")]
    value: String,
}

impl ChangeResourceRecordSetsRequest {
    pub fn from_batch(batch: &ChangeBatch) -> Self {
        let change = batch
            .changes
            .iter()
            .map(|change| ChangeXml {
                action: change.action.as_str(),
                record_set: ResourceRecordSetXml {
                    name: change.name.clone(),
                    record_type: change.record_type.as_str(),
                    ttl: change.ttl,
                    records: ResourceRecordsOut {
                        record: vec![ResourceRecordOut {
                            value: change.value.clone(),
                        }],
                    },
                },
            })
            .collect();

        Self {
            xmlns: NAMESPACE,
            change_batch: ChangeBatchXml {
                comment: batch.comment.clone(),
                changes: ChangesXml { change },
            },
        }
    }

    /// Serialize to a complete XML document
    pub fn to_xml(&self) -> Result<String, quick_xml::DeError> {
        let body = quick_xml::se::to_string(self)?;
        Ok(format!("{}{}", XML_DECLARATION, body))
    }
}

// ============ Responses ============

/// `ListResourceRecordSetsResponse`
#[derive(Debug, Deserialize)]
pub struct ListResourceRecordSetsResponse {
    #[serde(rename = "ResourceRecordSets", default)]
    record_sets: ResourceRecordSetsIn,
    #[serde(rename = "IsTruncated", default)]
    pub is_truncated: bool,
    #[serde(rename = "NextRecordName")]
    pub next_record_name: Option<String>,
    #[serde(rename = "NextRecordType")]
    pub next_record_type: Option<String>,
    #[serde(rename = "NextRecordIdentifier")]
    pub next_record_identifier: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ResourceRecordSetsIn {
    #[serde(rename = "ResourceRecordSet", default)]
    sets: Vec<ResourceRecordSetIn>,
}

#[derive(Debug, Deserialize)]
struct ResourceRecordSetIn {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Type")]
    record_type: String,
    #[serde(rename = "TTL")]
    ttl: Option<u32>,
    #[serde(rename = "ResourceRecords")]
    records: Option<ResourceRecordsIn>,
}

#[derive(Debug, Deserialize)]
struct ResourceRecordsIn {
    #[serde(rename = "ResourceRecord", default)]
    record: Vec<ResourceRecordIn>,
}

#[derive(Debug, Deserialize)]
struct ResourceRecordIn {
    #[serde(rename = "Value")]
    value: String,
}

impl ListResourceRecordSetsResponse {
    pub fn parse(xml: &str) -> Result<Self, quick_xml::DeError> {
        quick_xml::de::from_str(xml)
    }

    /// Record sets on this page, converted to provider-neutral form
    pub fn record_sets(self) -> Vec<RecordSet> {
        self.record_sets
            .sets
            .into_iter()
            .map(|set| RecordSet {
                name: set.name,
                record_type: set.record_type,
                ttl: set.ttl,
                values: set
                    .records
                    .map(|records| records.record.into_iter().map(|r| r.value).collect())
                    .unwrap_or_default(),
            })
            .collect()
    }
}

/// `ChangeResourceRecordSetsResponse`
#[derive(Debug, Deserialize)]
pub struct ChangeResourceRecordSetsResponse {
    #[serde(rename = "ChangeInfo")]
    pub change_info: ChangeInfo,
}

#[derive(Debug, Deserialize)]
pub struct ChangeInfo {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Status")]
    pub status: String,
}

impl ChangeResourceRecordSetsResponse {
    pub fn parse(xml: &str) -> Result<Self, quick_xml::DeError> {
        quick_xml::de::from_str(xml)
    }
}

/// Either `ErrorResponse` or `InvalidChangeBatch`
///
/// The root element name is not checked, so one type covers both shapes.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorDocument {
    #[serde(rename = "Error")]
    error: Option<ErrorDetail>,
    #[serde(rename = "Messages")]
    messages: Option<Messages>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(rename = "Code")]
    code: Option<String>,
    #[serde(rename = "Message")]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Messages {
    #[serde(rename = "Message", default)]
    message: Vec<String>,
}

impl ErrorDocument {
    /// Parse an error body; bodies that are not XML yield an empty document
    pub fn parse(xml: &str) -> Self {
        quick_xml::de::from_str(xml).unwrap_or_default()
    }

    /// AWS error code, if any
    pub fn code(&self) -> Option<&str> {
        if let Some(code) = self.error.as_ref().and_then(|e| e.code.as_deref()) {
            return Some(code);
        }
        self.messages.as_ref().map(|_| "InvalidChangeBatch")
    }

    /// Human readable message, if any
    pub fn message(&self) -> Option<String> {
        if let Some(message) = self.error.as_ref().and_then(|e| e.message.clone()) {
            return Some(message);
        }
        self.messages
            .as_ref()
            .filter(|m| !m.message.is_empty())
            .map(|m| m.message.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dyndns_core::traits::{Change, ChangeAction, RecordType};

    #[test]
    fn change_request_document() {
        let batch = ChangeBatch {
            comment: "Maintained by dyndns".to_string(),
            changes: vec![Change {
                action: ChangeAction::Upsert,
                name: "home.example.com".to_string(),
                record_type: RecordType::Aaaa,
                ttl: 300,
                value: "2001:db8::1".to_string(),
            }],
        };

        let xml = ChangeResourceRecordSetsRequest::from_batch(&batch)
            .to_xml()
            .unwrap();

        assert!(xml.starts_with(XML_DECLARATION));
        assert!(xml.contains(&format!(
            "<ChangeResourceRecordSetsRequest xmlns=\"{}\">",
            NAMESPACE
        )));
        assert!(xml.contains(
            "<ChangeBatch><Comment>Maintained by dyndns</Comment><Changes><Change>\
             <Action>UPSERT</Action><ResourceRecordSet><Name>home.example.com</Name>\
             <Type>AAAA</Type><TTL>300</TTL><ResourceRecords><ResourceRecord>\
             <Value>2001:db8::1</Value></ResourceRecord></ResourceRecords>\
             </ResourceRecordSet></Change></Changes></ChangeBatch>"
        ));
    }

    #[test]
    fn list_response_with_alias_and_multi_value() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListResourceRecordSetsResponse xmlns="https://route53.amazonaws.com/doc/2013-04-01/">
  <ResourceRecordSets>
    <ResourceRecordSet>
      <Name>example.com.</Name>
      <Type>A</Type>
      <AliasTarget>
        <HostedZoneId>Z2FDTNDATAQYW2</HostedZoneId>
        <DNSName>d111111abcdef8.cloudfront.net.</DNSName>
        <EvaluateTargetHealth>false</EvaluateTargetHealth>
      </AliasTarget>
    </ResourceRecordSet>
    <ResourceRecordSet>
      <Name>home.example.com.</Name>
      <Type>A</Type>
      <TTL>300</TTL>
      <ResourceRecords>
        <ResourceRecord><Value>192.0.2.1</Value></ResourceRecord>
        <ResourceRecord><Value>192.0.2.2</Value></ResourceRecord>
      </ResourceRecords>
    </ResourceRecordSet>
  </ResourceRecordSets>
  <IsTruncated>false</IsTruncated>
  <MaxItems>100</MaxItems>
</ListResourceRecordSetsResponse>"#;

        let response = ListResourceRecordSetsResponse::parse(xml).unwrap();
        assert!(!response.is_truncated);

        let sets = response.record_sets();
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0].name, "example.com.");
        assert!(sets[0].values.is_empty());
        assert_eq!(sets[0].ttl, None);
        assert_eq!(sets[1].ttl, Some(300));
        assert_eq!(sets[1].values, vec!["192.0.2.1", "192.0.2.2"]);
    }

    #[test]
    fn truncated_list_response_carries_next_markers() {
        let xml = r#"<ListResourceRecordSetsResponse>
  <ResourceRecordSets>
    <ResourceRecordSet>
      <Name>a.example.com.</Name><Type>TXT</Type><TTL>60</TTL>
      <ResourceRecords><ResourceRecord><Value>"hello"</Value></ResourceRecord></ResourceRecords>
    </ResourceRecordSet>
  </ResourceRecordSets>
  <IsTruncated>true</IsTruncated>
  <NextRecordName>home.example.com.</NextRecordName>
  <NextRecordType>A</NextRecordType>
  <MaxItems>1</MaxItems>
</ListResourceRecordSetsResponse>"#;

        let response = ListResourceRecordSetsResponse::parse(xml).unwrap();
        assert!(response.is_truncated);
        assert_eq!(response.next_record_name.as_deref(), Some("home.example.com."));
        assert_eq!(response.next_record_type.as_deref(), Some("A"));
        assert_eq!(response.next_record_identifier, None);
    }

    #[test]
    fn change_response() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<ChangeResourceRecordSetsResponse xmlns="https://route53.amazonaws.com/doc/2013-04-01/">
  <ChangeInfo>
    <Id>/change/C2682N5HXP0BZ4</Id>
    <Status>PENDING</Status>
    <SubmittedAt>2017-03-10T01:36:41.958Z</SubmittedAt>
  </ChangeInfo>
</ChangeResourceRecordSetsResponse>"#;

        let response = ChangeResourceRecordSetsResponse::parse(xml).unwrap();
        assert_eq!(response.change_info.id, "/change/C2682N5HXP0BZ4");
        assert_eq!(response.change_info.status, "PENDING");
    }

    #[test]
    fn error_documents() {
        let error = ErrorDocument::parse(
            r#"<ErrorResponse xmlns="https://route53.amazonaws.com/doc/2013-04-01/">
  <Error><Type>Sender</Type><Code>NoSuchHostedZone</Code><Message>No hosted zone found with ID: Z1</Message></Error>
  <RequestId>abc</RequestId>
</ErrorResponse>"#,
        );
        assert_eq!(error.code(), Some("NoSuchHostedZone"));
        assert_eq!(
            error.message().as_deref(),
            Some("No hosted zone found with ID: Z1")
        );

        let batch = ErrorDocument::parse(
            r#"<InvalidChangeBatch xmlns="https://route53.amazonaws.com/doc/2013-04-01/">
  <Messages><Message>Invalid Resource Record: FATAL problem</Message></Messages>
  <RequestId>abc</RequestId>
</InvalidChangeBatch>"#,
        );
        assert_eq!(batch.code(), Some("InvalidChangeBatch"));
        assert_eq!(
            batch.message().as_deref(),
            Some("Invalid Resource Record: FATAL problem")
        );

        let garbage = ErrorDocument::parse("Service Unavailable");
        assert_eq!(garbage.code(), None);
        assert_eq!(garbage.message(), None);
    }
}
