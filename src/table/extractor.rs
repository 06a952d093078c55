use crate::decode::{decode, Element, GenericValue};
use crate::error::Result;
use crate::table::types::{DocumentPass, ExtractedTable, Row};
use indexmap::IndexMap;
use tracing::{debug, info, warn};

/// Pulls table rows out of a parsed legends document.
///
/// Every direct child of the root is a collection (one table). Every child of
/// a collection is a record (one row), and every child of a record is one
/// field. A record's own XML attributes count as fields too and come first.
///
/// A field tag repeated inside one record keeps every occurrence: its cell is
/// the canonical encoding of a list of them. The same column can therefore
/// hold plain text in most rows and an encoded list in the few rows where the
/// field repeats.
pub struct RecordExtractor;

impl RecordExtractor {
    /// Extract every collection of a document.
    ///
    /// Collections repeating a name are concatenated into one table.
    pub fn extract(root: &Element) -> Result<DocumentPass> {
        let mut pass = DocumentPass {
            root_tag: root.tag.clone(),
            ..Default::default()
        };

        for collection in &root.children {
            info!("Extracting collection: {}", collection.tag);
            let position = match pass.tables.iter().position(|t| t.name == collection.tag) {
                Some(idx) => idx,
                None => {
                    pass.tables.push(ExtractedTable::new(collection.tag.as_str()));
                    pass.tables.len() - 1
                }
            };

            for record in &collection.children {
                match Self::extract_record(record)? {
                    Some(row) => pass.tables[position].push_row(row),
                    None => {
                        warn!("No children: {} in {}", record.tag, collection.tag);
                        pass.skipped_records += 1;
                    }
                }
            }

            let table = &pass.tables[position];
            debug!(
                "Collection {}: {} columns, {} rows so far",
                table.name,
                table.columns.len(),
                table.rows.len()
            );
        }

        Ok(pass)
    }

    /// Turn one record into a row; `None` when it carries no fields at all.
    pub fn extract_record(record: &Element) -> Result<Option<Row>> {
        if record.attributes.is_empty() && record.children.is_empty() {
            return Ok(None);
        }

        let mut row = Row::new();
        for (name, value) in &record.attributes {
            row.insert(name.clone(), value.clone());
        }

        // Group field elements by tag so repeated fields are not lost
        let mut fields: IndexMap<&str, Vec<&Element>> = IndexMap::new();
        for field in &record.children {
            fields.entry(field.tag.as_str()).or_default().push(field);
        }

        for (name, occurrences) in fields {
            let cell = match occurrences.as_slice() {
                [single] => Self::field_value(single)?,
                many => {
                    let items = many.iter().map(|f| Self::occurrence_value(f)).collect();
                    GenericValue::List(items).to_canonical_string()?
                }
            };
            row.insert(name.to_string(), cell);
        }

        Ok(Some(row))
    }

    /// Cell text of a field: leaf text, or the encoded subtree when structured.
    pub fn field_value(field: &Element) -> Result<String> {
        if field.is_leaf() {
            Ok(field.text.clone().unwrap_or_default())
        } else {
            decode(field).to_canonical_string()
        }
    }

    fn occurrence_value(field: &Element) -> GenericValue {
        if field.is_leaf() {
            GenericValue::Scalar(field.text.clone().unwrap_or_default())
        } else {
            decode(field)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::parse_document;

    fn extract(doc: &str) -> DocumentPass {
        let root = parse_document(doc, "test").unwrap();
        RecordExtractor::extract(&root).unwrap()
    }

    #[test]
    fn test_extract_leaf_fields() {
        let pass = extract(
            r#"<df_world>
                <regions>
                    <region><id>1</id><name>Foo</name><type>Forest</type></region>
                    <region><id>2</id><name>Bar</name><evilness>3</evilness></region>
                </regions>
            </df_world>"#,
        );

        assert_eq!(pass.root_tag, "df_world");
        let regions = pass.table("regions").unwrap();
        assert_eq!(regions.columns, vec!["id", "name", "type", "evilness"]);
        assert_eq!(regions.rows.len(), 2);
        assert_eq!(regions.rows[1].get("evilness").map(String::as_str), Some("3"));
        assert!(regions.rows[1].get("type").is_none());
    }

    #[test]
    fn test_structured_field_is_encoded() {
        let pass = extract(
            r#"<df_world><sites><site>
                <id>7</id>
                <structures>
                    <structure><local_id>0</local_id><type>market</type></structure>
                </structures>
            </site></sites></df_world>"#,
        );

        let row = &pass.table("sites").unwrap().rows[0];
        assert_eq!(
            row.get("structures").map(String::as_str),
            Some(r#"{"structure":{"local_id":"0","type":"market"}}"#)
        );
    }

    #[test]
    fn test_record_without_fields_is_skipped() {
        let pass = extract(
            r#"<df_world><regions>
                <region><id>1</id></region>
                <region/>
                <region><id>2</id></region>
            </regions></df_world>"#,
        );

        let regions = pass.table("regions").unwrap();
        assert_eq!(regions.rows.len(), 2);
        assert_eq!(pass.skipped_records, 1);
    }

    #[test]
    fn test_record_attributes_are_fields() {
        let pass = extract(
            r#"<df_world><regions><region id="1" name="Foo" type="Forest"/></regions></df_world>"#,
        );

        let regions = pass.table("regions").unwrap();
        assert_eq!(regions.columns, vec!["id", "name", "type"]);
        assert_eq!(regions.rows[0].get("name").map(String::as_str), Some("Foo"));
    }

    #[test]
    fn test_empty_field_is_empty_string() {
        let pass = extract(r#"<w><peaks><peak><id>3</id><is_volcano/></peak></peaks></w>"#);
        let row = &pass.table("peaks").unwrap().rows[0];
        assert_eq!(row.get("is_volcano").map(String::as_str), Some(""));
    }

    #[test]
    fn test_repeated_field_keeps_every_occurrence() {
        let pass = extract(
            r#"<w><historical_figures><historical_figure>
                <id>5</id><sphere>caverns</sphere><sphere>fire</sphere>
            </historical_figure></historical_figures></w>"#,
        );

        let row = &pass.table("historical_figures").unwrap().rows[0];
        assert_eq!(row.get("sphere").map(String::as_str), Some(r#"["caverns","fire"]"#));
    }

    #[test]
    fn test_repeated_collection_concatenates() {
        let pass = extract(
            r#"<w><rivers><river><name>a</name></river></rivers>
                 <rivers><river><path>1,2</path></river></rivers></w>"#,
        );

        assert_eq!(pass.tables.len(), 1);
        let rivers = pass.table("rivers").unwrap();
        assert_eq!(rivers.columns, vec!["name", "path"]);
        assert_eq!(rivers.rows.len(), 2);
    }

    #[test]
    fn test_tables_in_document_order() {
        let pass = extract(r#"<w><sites/><regions/><artifacts/></w>"#);
        let names: Vec<_> = pass.tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["sites", "regions", "artifacts"]);
        assert!(pass.tables.iter().all(|t| t.columns.is_empty()));
    }
}
