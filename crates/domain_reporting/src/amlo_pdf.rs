//! AMLO PDF form generator
//!
//! Each AMLO form (1-01, 1-02, 1-03) is an externally supplied PDF template
//! with named AcroForm fields. The generator maps semantic report fields
//! onto template field names through a data-driven template map, fills the
//! field values, sets `NeedAppearances` so Adobe Reader regenerates
//! appearances, and then overlays the same values as flat text at each
//! field rectangle for viewers that ignore appearance regeneration.
//!
//! Output is deterministic: `<output_dir>/<report_no>.pdf`, overwritten on
//! re-render, so concurrent renders of the same report are idempotent.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, warn};

use chrono::{Datelike, NaiveDate};
use core_kernel::temporal::BUDDHIST_ERA_OFFSET;
use domain_compliance::ReportType;

use crate::error::ReportingError;
use crate::report::AmloReport;
use crate::thai;

/// Where one semantic field lands on the template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateTarget {
    /// A single text field
    Text(String),
    /// A run of one-character boxes named `<prefix>1..=<count>`
    DigitBoxes { prefix: String, count: usize },
    /// A date decomposed into day / month / Buddhist-era-year fields
    BuddhistDate {
        day_field: String,
        month_field: String,
        year_field: String,
    },
    /// A checkbox group; the matching option's field is ticked, all
    /// others cleared, unknown values tick nothing
    Checkboxes(Vec<(String, String)>),
}

/// Per-form-version mapping from semantic fields to template fields
///
/// Maintained alongside the template file: when the regulator revises a
/// form, only this map and the template change.
#[derive(Debug, Clone)]
pub struct FormTemplateMap {
    pub report_type: ReportType,
    targets: Vec<(String, TemplateTarget)>,
}

impl FormTemplateMap {
    pub fn new(report_type: ReportType, targets: Vec<(String, TemplateTarget)>) -> Self {
        Self {
            report_type,
            targets,
        }
    }

    /// The mapping for the currently filed form versions
    pub fn builtin(report_type: ReportType) -> Self {
        let mut targets = vec![
            (
                "report_no".to_string(),
                TemplateTarget::Text("report_no".to_string()),
            ),
            (
                "customer_id".to_string(),
                TemplateTarget::DigitBoxes {
                    prefix: "customer_id_".to_string(),
                    count: 13,
                },
            ),
            (
                "customer_name".to_string(),
                TemplateTarget::Text("customer_name".to_string()),
            ),
            (
                "customer_country".to_string(),
                TemplateTarget::Text("customer_country".to_string()),
            ),
            (
                "transaction_date".to_string(),
                TemplateTarget::BuddhistDate {
                    day_field: "txn_day".to_string(),
                    month_field: "txn_month".to_string(),
                    year_field: "txn_year_be".to_string(),
                },
            ),
            (
                "id_type".to_string(),
                TemplateTarget::Checkboxes(vec![
                    ("citizen".to_string(), "chk_id_citizen".to_string()),
                    ("passport".to_string(), "chk_id_passport".to_string()),
                    ("corporate".to_string(), "chk_id_corporate".to_string()),
                ]),
            ),
            (
                "amount".to_string(),
                TemplateTarget::Text("amount".to_string()),
            ),
            (
                "amount_text".to_string(),
                TemplateTarget::Text("amount_text".to_string()),
            ),
            (
                "currency_code".to_string(),
                TemplateTarget::Text("currency_code".to_string()),
            ),
        ];
        if report_type == ReportType::Amlo103 {
            targets.push((
                "suspicion_reason".to_string(),
                TemplateTarget::Text("suspicion_reason".to_string()),
            ));
        }
        Self::new(report_type, targets)
    }

    pub fn targets(&self) -> &[(String, TemplateTarget)] {
        &self.targets
    }
}

/// Splits a value into per-character box fills, left-aligned
///
/// Boxes beyond the value stay blank; characters beyond the boxes are
/// dropped (the template has as many boxes as the document allows digits).
pub fn digit_boxes(value: &str, count: usize) -> Vec<String> {
    let mut boxes = vec![String::new(); count];
    for (i, c) in value.chars().take(count).enumerate() {
        boxes[i] = c.to_string();
    }
    boxes
}

/// Decomposes a date into (day, month, Buddhist-era year)
pub fn be_date_parts(date: NaiveDate) -> (u32, u32, i32) {
    (date.day(), date.month(), date.year() + BUDDHIST_ERA_OFFSET)
}

/// Resolves a checkbox group: the field to tick, if the value is known
pub fn checkbox_selection<'a>(
    options: &'a [(String, String)],
    value: &str,
) -> Option<&'a str> {
    options
        .iter()
        .find(|(option, _)| option == value)
        .map(|(_, field)| field.as_str())
}

/// Renders AMLO report PDFs from form data
#[derive(Debug, Clone)]
pub struct AmloPdfGenerator {
    template_dir: PathBuf,
    output_dir: PathBuf,
}

impl AmloPdfGenerator {
    pub fn new(template_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            template_dir: template_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    /// Template file for a form version
    pub fn template_path(&self, report_type: ReportType) -> PathBuf {
        let name = match report_type {
            ReportType::Amlo101 => "amlo_1_01.pdf",
            ReportType::Amlo102 => "amlo_1_02.pdf",
            ReportType::Amlo103 => "amlo_1_03.pdf",
        };
        self.template_dir.join(name)
    }

    /// Deterministic output path for a report
    pub fn output_path(&self, report_no: &str) -> PathBuf {
        self.output_dir.join(format!("{report_no}.pdf"))
    }

    /// Fills the template for `report` and writes the PDF
    ///
    /// Values come from the reservation's `form_data`, with the report's
    /// own number, amount and date injected. Returns the written path.
    pub fn render(
        &self,
        report: &AmloReport,
        form_data: &Value,
    ) -> Result<PathBuf, ReportingError> {
        let map = FormTemplateMap::builtin(report.report_format);
        self.render_with_map(report, form_data, &map)
    }

    /// Fills using an explicit template map (for revised form versions)
    pub fn render_with_map(
        &self,
        report: &AmloReport,
        form_data: &Value,
        map: &FormTemplateMap,
    ) -> Result<PathBuf, ReportingError> {
        let template = self.template_path(map.report_type);
        if !template.exists() {
            return Err(ReportingError::TemplateMissing(template));
        }

        let fills = resolve_fills(report, form_data, map);

        let mut doc = Document::load(&template)
            .map_err(|e| ReportingError::RenderFailure(format!("load template: {e}")))?;

        set_need_appearances(&mut doc)
            .map_err(|e| ReportingError::RenderFailure(format!("acroform: {e}")))?;

        let placed = fill_fields(&mut doc, &fills)
            .map_err(|e| ReportingError::RenderFailure(format!("fill fields: {e}")))?;
        debug!(
            report_no = %report.report_no,
            filled = placed.len(),
            requested = fills.len(),
            "filled template fields"
        );
        if placed.len() < fills.len() {
            warn!(
                report_no = %report.report_no,
                missing = fills.len() - placed.len(),
                "template is missing some mapped fields"
            );
        }

        overlay_flat_text(&mut doc, &placed)
            .map_err(|e| ReportingError::RenderFailure(format!("overlay: {e}")))?;

        std::fs::create_dir_all(&self.output_dir)?;
        let out = self.output_path(&report.report_no);
        doc.save(&out)
            .map_err(|e| ReportingError::RenderFailure(format!("save: {e}")))?;
        Ok(out)
    }
}

/// A concrete (template field, value) pair ready to fill
#[derive(Debug, Clone, PartialEq, Eq)]
struct FieldFill {
    field: String,
    value: String,
}

/// A filled field located on a page, for the flat-text overlay
struct PlacedField {
    page_id: ObjectId,
    rect: [f32; 4],
    value: String,
}

fn resolve_fills(report: &AmloReport, form_data: &Value, map: &FormTemplateMap) -> Vec<FieldFill> {
    // Report-owned values take precedence over whatever the form carried;
    // the persisted report row is the authoritative record.
    let mut source: HashMap<String, String> = HashMap::new();
    if let Some(object) = form_data.as_object() {
        for (key, value) in object {
            if let Some(text) = value_as_text(value) {
                source.insert(key.clone(), text);
            }
        }
    }
    source.insert("report_no".to_string(), report.report_no.clone());
    source.insert("customer_id".to_string(), report.customer_id.clone());
    source.insert("customer_name".to_string(), report.customer_name.clone());
    source.insert(
        "customer_country".to_string(),
        report.customer_country.clone(),
    );
    source.insert("amount".to_string(), report.amount.to_string());
    source.insert(
        "transaction_date".to_string(),
        report.transaction_date.format("%Y-%m-%d").to_string(),
    );
    source
        .entry("amount_text".to_string())
        .or_insert_with(|| thai::baht_text(report.amount).unwrap_or_default());

    let mut fills = Vec::new();
    for (semantic, target) in map.targets() {
        let value = match source.get(semantic) {
            Some(value) if !value.is_empty() => value,
            _ => continue,
        };
        match target {
            TemplateTarget::Text(field) => fills.push(FieldFill {
                field: field.clone(),
                value: value.clone(),
            }),
            TemplateTarget::DigitBoxes { prefix, count } => {
                for (i, cell) in digit_boxes(value, *count).into_iter().enumerate() {
                    if !cell.is_empty() {
                        fills.push(FieldFill {
                            field: format!("{prefix}{}", i + 1),
                            value: cell,
                        });
                    }
                }
            }
            TemplateTarget::BuddhistDate {
                day_field,
                month_field,
                year_field,
            } => {
                if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
                    let (day, month, be_year) = be_date_parts(date);
                    fills.push(FieldFill {
                        field: day_field.clone(),
                        value: day.to_string(),
                    });
                    fills.push(FieldFill {
                        field: month_field.clone(),
                        value: month.to_string(),
                    });
                    fills.push(FieldFill {
                        field: year_field.clone(),
                        value: be_year.to_string(),
                    });
                }
            }
            TemplateTarget::Checkboxes(options) => {
                if let Some(field) = checkbox_selection(options, value) {
                    fills.push(FieldFill {
                        field: field.to_string(),
                        value: "Yes".to_string(),
                    });
                }
            }
        }
    }
    fills
}

fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

enum AcroFormLocation {
    Referenced(ObjectId),
    Inline,
    Absent,
}

/// Sets `/NeedAppearances true` on the document's AcroForm
fn set_need_appearances(doc: &mut Document) -> lopdf::Result<()> {
    let catalog_id = doc.trailer.get(b"Root")?.as_reference()?;
    let location = {
        let catalog = doc.get_object(catalog_id)?.as_dict()?;
        match catalog.get(b"AcroForm") {
            Ok(Object::Reference(form_id)) => AcroFormLocation::Referenced(*form_id),
            Ok(_) => AcroFormLocation::Inline,
            Err(_) => AcroFormLocation::Absent,
        }
    };

    match location {
        AcroFormLocation::Referenced(form_id) => {
            doc.get_object_mut(form_id)?
                .as_dict_mut()?
                .set("NeedAppearances", Object::Boolean(true));
        }
        AcroFormLocation::Inline => {
            doc.get_object_mut(catalog_id)?
                .as_dict_mut()?
                .get_mut(b"AcroForm")?
                .as_dict_mut()?
                .set("NeedAppearances", Object::Boolean(true));
        }
        // Template without a form dictionary: nothing to fill against
        AcroFormLocation::Absent => {}
    }
    Ok(())
}

/// Sets `/V` on every widget whose `/T` matches a fill
///
/// Existing appearance streams are dropped so `NeedAppearances` viewers
/// regenerate them from the new value.
fn fill_fields(doc: &mut Document, fills: &[FieldFill]) -> lopdf::Result<Vec<PlacedField>> {
    let wanted: HashMap<&str, &str> = fills
        .iter()
        .map(|f| (f.field.as_str(), f.value.as_str()))
        .collect();

    // Collect widget ids per page first; mutation follows
    let mut widgets: Vec<(ObjectId, ObjectId)> = Vec::new();
    for (_, page_id) in doc.get_pages() {
        let annot_ids: Vec<ObjectId> = {
            let page = doc.get_object(page_id)?.as_dict()?;
            match page.get(b"Annots") {
                Ok(Object::Array(entries)) => entries
                    .iter()
                    .filter_map(|e| e.as_reference().ok())
                    .collect(),
                Ok(Object::Reference(list_id)) => match doc.get_object(*list_id) {
                    Ok(Object::Array(entries)) => entries
                        .iter()
                        .filter_map(|e| e.as_reference().ok())
                        .collect(),
                    _ => Vec::new(),
                },
                _ => Vec::new(),
            }
        };
        for annot_id in annot_ids {
            widgets.push((page_id, annot_id));
        }
    }

    let mut placed = Vec::new();
    for (page_id, annot_id) in widgets {
        let dict = match doc.get_object_mut(annot_id).and_then(Object::as_dict_mut) {
            Ok(dict) => dict,
            Err(_) => continue,
        };
        let name = match dict.get(b"T") {
            Ok(Object::String(bytes, _)) => String::from_utf8_lossy(bytes).into_owned(),
            _ => continue,
        };
        let value = match wanted.get(name.as_str()) {
            Some(value) => (*value).to_string(),
            None => continue,
        };

        dict.set("V", Object::string_literal(value.clone()));
        dict.remove(b"AP");

        if let Some(rect) = dict
            .get(b"Rect")
            .ok()
            .and_then(|r| r.as_array().ok())
            .and_then(parse_rect)
        {
            placed.push(PlacedField {
                page_id,
                rect,
                value,
            });
        }
    }
    Ok(placed)
}

fn parse_rect(values: &Vec<Object>) -> Option<[f32; 4]> {
    if values.len() != 4 {
        return None;
    }
    let mut rect = [0f32; 4];
    for (i, value) in values.iter().enumerate() {
        rect[i] = match value {
            Object::Integer(n) => *n as f32,
            Object::Real(r) => *r as f32,
            _ => return None,
        };
    }
    Some(rect)
}

const OVERLAY_FONT: &str = "HelvOverlay";
const OVERLAY_SIZE: f32 = 9.0;

/// Draws each filled value as flat page text inside its field rectangle
fn overlay_flat_text(doc: &mut Document, placed: &[PlacedField]) -> lopdf::Result<()> {
    if placed.is_empty() {
        return Ok(());
    }

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut by_page: HashMap<ObjectId, Vec<&PlacedField>> = HashMap::new();
    for field in placed {
        by_page.entry(field.page_id).or_default().push(field);
    }

    for (page_id, fields) in by_page {
        ensure_overlay_font(doc, page_id, font_id)?;

        let mut operations = Vec::new();
        for field in fields {
            let [x1, y1, _, _] = field.rect;
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new(
                "Tf",
                vec![
                    Object::Name(OVERLAY_FONT.as_bytes().to_vec()),
                    Object::Real(OVERLAY_SIZE as _),
                ],
            ));
            operations.push(Operation::new(
                "Td",
                vec![
                    Object::Real((x1 + 2.0) as _),
                    Object::Real((y1 + 2.0) as _),
                ],
            ));
            operations.push(Operation::new(
                "Tj",
                vec![Object::string_literal(field.value.clone())],
            ));
            operations.push(Operation::new("ET", vec![]));
        }

        let content = Content { operations };
        let stream_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        append_page_content(doc, page_id, stream_id)?;
    }
    Ok(())
}

/// Registers the overlay font in the page's resource dictionary
fn ensure_overlay_font(
    doc: &mut Document,
    page_id: ObjectId,
    font_id: ObjectId,
) -> lopdf::Result<()> {
    let resources_ref = {
        let page = doc.get_object(page_id)?.as_dict()?;
        match page.get(b"Resources") {
            Ok(Object::Reference(id)) => Some(*id),
            _ => None,
        }
    };

    let resources = match resources_ref {
        Some(id) => doc.get_object_mut(id)?.as_dict_mut()?,
        None => {
            let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
            if page.get(b"Resources").is_err() {
                page.set("Resources", dictionary! {});
            }
            page.get_mut(b"Resources")?.as_dict_mut()?
        }
    };

    if resources.get(b"Font").is_err() {
        resources.set("Font", dictionary! {});
    }
    resources
        .get_mut(b"Font")?
        .as_dict_mut()?
        .set(OVERLAY_FONT, Object::Reference(font_id));
    Ok(())
}

/// Appends a content stream to a page, preserving the existing streams
fn append_page_content(
    doc: &mut Document,
    page_id: ObjectId,
    stream_id: ObjectId,
) -> lopdf::Result<()> {
    let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
    let contents = match page.get(b"Contents") {
        Ok(Object::Reference(existing)) => {
            vec![Object::Reference(*existing), Object::Reference(stream_id)]
        }
        Ok(Object::Array(existing)) => {
            let mut entries = existing.clone();
            entries.push(Object::Reference(stream_id));
            entries
        }
        _ => vec![Object::Reference(stream_id)],
    };
    page.set("Contents", contents);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use core_kernel::{AmloReportId, BranchId, OperatorId, ReservationId};
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_digit_boxes_left_aligned_with_blank_padding() {
        let boxes = digit_boxes("1234567890123", 13);
        assert_eq!(boxes.len(), 13);
        assert_eq!(boxes[0], "1");
        assert_eq!(boxes[12], "3");

        let short = digit_boxes("AB12", 9);
        assert_eq!(short[3], "2");
        assert!(short[4..].iter().all(String::is_empty));

        // Overflow characters are dropped, not wrapped
        let long = digit_boxes("123456", 3);
        assert_eq!(long, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_be_date_parts() {
        let date = NaiveDate::from_ymd_opt(2025, 10, 1).unwrap();
        assert_eq!(be_date_parts(date), (1, 10, 2568));
    }

    #[test]
    fn test_checkbox_selection() {
        let options = vec![
            ("citizen".to_string(), "chk_citizen".to_string()),
            ("passport".to_string(), "chk_passport".to_string()),
        ];
        assert_eq!(checkbox_selection(&options, "passport"), Some("chk_passport"));
        // Unknown value ticks nothing
        assert_eq!(checkbox_selection(&options, "licence"), None);
    }

    fn sample_report() -> AmloReport {
        AmloReport {
            id: AmloReportId::new(),
            report_no: "001-001-68-100001USD".to_string(),
            report_format: ReportType::Amlo101,
            reservation_id: ReservationId::new(),
            transaction_id: None,
            customer_id: "1234567890123".to_string(),
            customer_name: "Somchai Jaidee".to_string(),
            customer_country: "TH".to_string(),
            amount: dec!(2130000.00),
            transaction_date: NaiveDate::from_ymd_opt(2025, 10, 1).unwrap(),
            pdf_path: None,
            is_reported: false,
            reported_at: None,
            branch_id: BranchId::new(),
            operator_id: OperatorId::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_resolve_fills_report_values_win() {
        let report = sample_report();
        let form = json!({
            "customer_name": "Stale Name From Form",
            "id_type": "citizen",
        });
        let map = FormTemplateMap::builtin(ReportType::Amlo101);
        let fills = resolve_fills(&report, &form, &map);

        let get = |field: &str| {
            fills
                .iter()
                .find(|f| f.field == field)
                .map(|f| f.value.clone())
        };
        assert_eq!(get("report_no"), Some("001-001-68-100001USD".to_string()));
        // The persisted report row wins over the form payload
        assert_eq!(get("customer_name"), Some("Somchai Jaidee".to_string()));
        // 13 digit boxes, one character each
        assert_eq!(get("customer_id_1"), Some("1".to_string()));
        assert_eq!(get("customer_id_13"), Some("3".to_string()));
        // Buddhist-era date decomposition
        assert_eq!(get("txn_day"), Some("1".to_string()));
        assert_eq!(get("txn_month"), Some("10".to_string()));
        assert_eq!(get("txn_year_be"), Some("2568".to_string()));
        // Checkbox resolved to its template field
        assert_eq!(get("chk_id_citizen"), Some("Yes".to_string()));
        assert_eq!(get("chk_id_passport"), None);
    }

    #[test]
    fn test_missing_template_is_reported() {
        let dir = std::env::temp_dir().join(format!("amlo_none_{}", std::process::id()));
        let generator = AmloPdfGenerator::new(dir.join("templates"), dir.join("out"));
        let err = generator.render(&sample_report(), &json!({})).unwrap_err();
        assert!(matches!(err, ReportingError::TemplateMissing(_)));
    }

    /// Builds a one-page template with real AcroForm text fields
    fn synthetic_template(field_names: &[&str]) -> Document {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut annot_ids = Vec::new();
        for (i, name) in field_names.iter().enumerate() {
            let y = 700 - (i as i64) * 30;
            let annot_id = doc.add_object(dictionary! {
                "Type" => "Annot",
                "Subtype" => "Widget",
                "FT" => "Tx",
                "T" => Object::string_literal(*name),
                "Rect" => vec![50.into(), y.into(), 300.into(), (y + 20).into()],
            });
            annot_ids.push(annot_id);
        }

        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            Content { operations: vec![] }.encode().unwrap(),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            "Contents" => Object::Reference(content_id),
            "Annots" => annot_ids.iter().map(|id| Object::Reference(*id)).collect::<Vec<_>>(),
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1,
            }),
        );
        let form_id = doc.add_object(dictionary! {
            "Fields" => annot_ids.iter().map(|id| Object::Reference(*id)).collect::<Vec<_>>(),
        });
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
            "AcroForm" => Object::Reference(form_id),
        });
        doc.trailer.set("Root", catalog_id);
        doc
    }

    #[test]
    fn test_render_fills_sets_need_appearances_and_overlays() {
        let base = std::env::temp_dir().join(format!("amlo_render_{}", std::process::id()));
        let template_dir = base.join("templates");
        let output_dir = base.join("out");
        std::fs::create_dir_all(&template_dir).unwrap();

        let mut template = synthetic_template(&["report_no", "customer_name", "amount"]);
        template.save(template_dir.join("amlo_1_01.pdf")).unwrap();

        let generator = AmloPdfGenerator::new(&template_dir, &output_dir);
        let report = sample_report();
        let path = generator.render(&report, &json!({})).unwrap();
        assert_eq!(path, output_dir.join("001-001-68-100001USD.pdf"));

        let rendered = Document::load(&path).unwrap();

        // Field values are set
        let mut found_name = false;
        for (_, object) in rendered.objects.iter() {
            if let Ok(dict) = object.as_dict() {
                if let Ok(Object::String(bytes, _)) = dict.get(b"T") {
                    if bytes == b"customer_name" {
                        let value = dict.get(b"V").unwrap();
                        if let Object::String(v, _) = value {
                            assert_eq!(String::from_utf8_lossy(v), "Somchai Jaidee");
                            found_name = true;
                        }
                    }
                }
            }
        }
        assert!(found_name, "customer_name field was not filled");

        // NeedAppearances is set on the AcroForm
        let catalog_id = rendered.trailer.get(b"Root").unwrap().as_reference().unwrap();
        let form_id = rendered
            .get_object(catalog_id)
            .unwrap()
            .as_dict()
            .unwrap()
            .get(b"AcroForm")
            .unwrap()
            .as_reference()
            .unwrap();
        let form = rendered.get_object(form_id).unwrap().as_dict().unwrap();
        assert_eq!(form.get(b"NeedAppearances").unwrap(), &Object::Boolean(true));

        // The page gained an overlay content stream
        let (_, page_id) = rendered.get_pages().into_iter().next().unwrap();
        let page = rendered.get_object(page_id).unwrap().as_dict().unwrap();
        match page.get(b"Contents").unwrap() {
            Object::Array(streams) => assert_eq!(streams.len(), 2),
            other => panic!("expected content array, got {other:?}"),
        }

        // Re-rendering overwrites the same path
        let again = generator.render(&report, &json!({})).unwrap();
        assert_eq!(again, path);
    }
}
