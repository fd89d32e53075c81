//! BOT monthly workbook generator
//!
//! The central bank ingests one workbook per branch per month with four
//! sheets: Provider Info (a header block identifying the licensee and the
//! reporting month), Buy FX, Sell FX, and FCD. The workbook is produced by
//! copying a template file and writing data cells into it; template
//! styling, lookup sheets, and formula columns are never touched. The
//! template computes the baht amount and the human-readable label columns
//! itself, so the generator must leave those columns alone.

use rust_decimal::prelude::ToPrimitive;
use std::path::PathBuf;
use tracing::info;
use umya_spreadsheet::{reader, writer, Spreadsheet, Worksheet};

use core_kernel::{ThaiMonth, YearMonth};

use crate::error::ReportingError;
use crate::number::BranchCodes;
use crate::report::{BotFcdEvent, BotFxEvent};

/// Sheet names, in workbook order
pub const SHEET_PROVIDER: &str = "Provider Info";
pub const SHEET_BUY_FX: &str = "Buy FX";
pub const SHEET_SELL_FX: &str = "Sell FX";
pub const SHEET_FCD: &str = "FCD";

/// First data row on the FX sheets; rows 1-8 are the template header
pub const FX_FIRST_DATA_ROW: u32 = 9;
/// First data row on the FCD sheet
pub const FCD_FIRST_DATA_ROW: u32 = 8;

/// Template-computed columns on the FX sheets; writing them would clobber
/// the template's formulas and lookups
pub const FX_FORMULA_COLUMNS: [&str; 9] = ["D", "G", "H", "I", "J", "L", "O", "P", "Q"];

/// One month of BOT-classified events for one branch
#[derive(Debug, Clone)]
pub struct BotMonthData {
    pub codes: BranchCodes,
    pub ym: YearMonth,
    pub buy_fx: Vec<BotFxEvent>,
    pub sell_fx: Vec<BotFxEvent>,
    pub fcd: Vec<BotFcdEvent>,
}

/// Renders the monthly BOT workbook from a template
#[derive(Debug, Clone)]
pub struct BotExcelGenerator {
    template_path: PathBuf,
    output_root: PathBuf,
}

impl BotExcelGenerator {
    pub fn new(template_path: impl Into<PathBuf>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            template_path: template_path.into(),
            output_root: output_root.into(),
        }
    }

    /// Deterministic output path: `<root>/<YYYY>/<MM>/<sender>-<YYYYMM>.xlsx`
    pub fn output_path(&self, codes: &BranchCodes, ym: YearMonth) -> PathBuf {
        self.output_root
            .join(format!("{:04}", ym.year))
            .join(format!("{:02}", ym.month))
            .join(format!(
                "{}-{:04}{:02}.xlsx",
                codes.bot_sender_code, ym.year, ym.month
            ))
    }

    /// Produces the workbook for one branch-month
    ///
    /// Idempotent: re-running writes to a fresh temp file and renames over
    /// the previous artifact. Row order inside each sheet is event time
    /// then event id, and sheet sequence numbers restart at 1.
    pub fn render(&self, data: &BotMonthData) -> Result<PathBuf, ReportingError> {
        if !self.template_path.exists() {
            return Err(ReportingError::TemplateMissing(self.template_path.clone()));
        }

        let mut book = reader::xlsx::read(&self.template_path)
            .map_err(|e| ReportingError::RenderFailure(format!("read template: {e}")))?;

        self.write_provider_info(&mut book, data)?;

        let mut buy = data.buy_fx.clone();
        sort_fx(&mut buy);
        write_fx_rows(sheet_mut(&mut book, SHEET_BUY_FX)?, &buy);

        let mut sell = data.sell_fx.clone();
        sort_fx(&mut sell);
        write_fx_rows(sheet_mut(&mut book, SHEET_SELL_FX)?, &sell);

        let mut fcd = data.fcd.clone();
        fcd.sort_by(|a, b| {
            a.event_time
                .cmp(&b.event_time)
                .then_with(|| a.id.as_uuid().cmp(b.id.as_uuid()))
        });
        write_fcd_rows(sheet_mut(&mut book, SHEET_FCD)?, &fcd);

        let out = self.output_path(&data.codes, data.ym);
        if let Some(parent) = out.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Single writer per (branch, month) path: edit a unique temp copy,
        // then rename into place so a crashed render never leaves a
        // half-written artifact at the published path.
        let tmp = out.with_extension(format!("xlsx.tmp-{}", std::process::id()));
        writer::xlsx::write(&book, &tmp)
            .map_err(|e| ReportingError::RenderFailure(format!("write workbook: {e}")))?;
        std::fs::rename(&tmp, &out)?;

        info!(
            month = %data.ym,
            buy_rows = buy.len(),
            sell_rows = sell.len(),
            fcd_rows = fcd.len(),
            path = %out.display(),
            "rendered BOT workbook"
        );
        Ok(out)
    }

    fn write_provider_info(
        &self,
        book: &mut Spreadsheet,
        data: &BotMonthData,
    ) -> Result<(), ReportingError> {
        let sheet = sheet_mut(book, SHEET_PROVIDER)?;
        let codes = &data.codes;
        let ym = data.ym;

        sheet.get_cell_mut("B2").set_value(&codes.institution_code);
        sheet.get_cell_mut("B3").set_value(&codes.license_holder);
        sheet.get_cell_mut("B4").set_value(&codes.license_no);
        sheet.get_cell_mut("B5").set_value(&codes.branch_name);
        sheet
            .get_cell_mut("B6")
            .set_value(&codes.bot_branch_area_code);
        sheet
            .get_cell_mut("B7")
            .set_value(ThaiMonth(ym.month).name());
        sheet
            .get_cell_mut("B8")
            .set_value_number(ym.buddhist_year() as f64);
        sheet
            .get_cell_mut("B9")
            .set_value(ym.last_day().format("%Y-%m-%d").to_string());
        Ok(())
    }
}

fn sheet_mut<'a>(
    book: &'a mut Spreadsheet,
    name: &str,
) -> Result<&'a mut Worksheet, ReportingError> {
    book.get_sheet_by_name_mut(name)
        .ok_or_else(|| ReportingError::RenderFailure(format!("template has no sheet '{name}'")))
}

fn sort_fx(rows: &mut [BotFxEvent]) {
    rows.sort_by(|a, b| {
        a.event_time
            .cmp(&b.event_time)
            .then_with(|| a.id.as_uuid().cmp(b.id.as_uuid()))
    });
}

/// Writes FX rows, steering around the template's formula columns
fn write_fx_rows(sheet: &mut Worksheet, rows: &[BotFxEvent]) {
    for (i, event) in rows.iter().enumerate() {
        let row = FX_FIRST_DATA_ROW + i as u32;
        let seq = (i + 1) as f64;

        sheet
            .get_cell_mut(format!("A{row}"))
            .set_value_number(seq);
        sheet
            .get_cell_mut(format!("B{row}"))
            .set_value(event.customer_type.as_str());
        sheet
            .get_cell_mut(format!("C{row}"))
            .set_value(&event.customer_name);
        // D: customer-type label, template lookup
        sheet
            .get_cell_mut(format!("E{row}"))
            .set_value(event.id_type.code());
        sheet
            .get_cell_mut(format!("F{row}"))
            .set_value(&event.id_number);
        // G..J: template formulas
        sheet
            .get_cell_mut(format!("K{row}"))
            .set_value(&event.country_code);
        // L: template lookup
        sheet
            .get_cell_mut(format!("M{row}"))
            .set_value(event.currency_code.as_str());
        sheet
            .get_cell_mut(format!("N{row}"))
            .set_value_number(event.rate.to_f64().unwrap_or_default());
        // O..Q: template formulas, including baht amount = rate x foreign
        sheet
            .get_cell_mut(format!("R{row}"))
            .set_value_number(event.foreign_amount.to_f64().unwrap_or_default());
        sheet
            .get_cell_mut(format!("S{row}"))
            .set_value(&event.payment_method);
        if let Some(remarks) = &event.remarks {
            sheet.get_cell_mut(format!("T{row}")).set_value(remarks);
        }
    }
}

fn write_fcd_rows(sheet: &mut Worksheet, rows: &[BotFcdEvent]) {
    for (i, event) in rows.iter().enumerate() {
        let row = FCD_FIRST_DATA_ROW + i as u32;
        let (be_year, month, day) = (
            core_kernel::temporal::buddhist_year(event.event_date),
            event.event_date.format("%m").to_string(),
            event.event_date.format("%d").to_string(),
        );

        sheet
            .get_cell_mut(format!("A{row}"))
            .set_value_number((i + 1) as f64);
        sheet
            .get_cell_mut(format!("B{row}"))
            .set_value_number(be_year as f64);
        sheet.get_cell_mut(format!("C{row}")).set_value(month);
        sheet.get_cell_mut(format!("D{row}")).set_value(day);
        sheet
            .get_cell_mut(format!("E{row}"))
            .set_value(&event.bank_name);
        sheet
            .get_cell_mut(format!("F{row}"))
            .set_value(&event.account_no);
        sheet
            .get_cell_mut(format!("G{row}"))
            .set_value(event.currency_code.as_str());
        sheet
            .get_cell_mut(format!("H{row}"))
            .set_value_number(event.balance.to_f64().unwrap_or_default());
        sheet
            .get_cell_mut(format!("I{row}"))
            .set_value_number(event.amount.to_f64().unwrap_or_default());
        if let Some(remarks) = &event.remarks {
            sheet.get_cell_mut(format!("J{row}")).set_value(remarks);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use core_kernel::{
        AdjustmentId, BotEventId, BranchId, CurrencyCode, TransactionId,
    };
    use std::path::Path;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    use crate::report::{BotProviderEvent, CustomerTypeCode, IdType};

    fn codes() -> BranchCodes {
        BranchCodes {
            institution_code: "001".to_string(),
            branch_code: "001".to_string(),
            bot_sender_code: "C001".to_string(),
            bot_branch_area_code: "10".to_string(),
            license_no: "MC-123/2560".to_string(),
            license_holder: "Siam Exchange Co., Ltd.".to_string(),
            branch_name: "Silom Road Branch".to_string(),
        }
    }

    fn fx_event(id: u128, hour: u32) -> BotFxEvent {
        BotFxEvent {
            id: BotEventId::from_uuid(Uuid::from_u128(id)),
            branch_id: BranchId::new(),
            transaction_id: TransactionId::new(),
            customer_type: CustomerTypeCode::IndividualResident,
            customer_name: format!("Customer {id}"),
            id_type: IdType::ThaiCitizenId,
            id_number: "1234567890123".to_string(),
            country_code: "TH".to_string(),
            currency_code: CurrencyCode::USD,
            rate: dec!(35.50),
            foreign_amount: dec!(1000),
            local_amount: dec!(35500),
            usd_equivalent: dec!(1000),
            payment_method: "CASH".to_string(),
            remarks: None,
            event_time: Utc.with_ymd_and_hms(2025, 10, 5, hour, 0, 0).unwrap(),
            is_reported: false,
            reported_at: None,
            created_at: Utc::now(),
        }
    }

    fn fcd_event() -> BotFcdEvent {
        BotFcdEvent {
            id: BotEventId::new(),
            branch_id: BranchId::new(),
            transaction_id: TransactionId::new(),
            event_date: NaiveDate::from_ymd_opt(2025, 10, 7).unwrap(),
            bank_name: "Krung Thai Bank".to_string(),
            account_no: "123-4-56789-0".to_string(),
            currency_code: CurrencyCode::USD,
            balance: dec!(120000),
            amount: dec!(25000),
            remarks: Some("FCD deposit".to_string()),
            event_time: Utc.with_ymd_and_hms(2025, 10, 7, 9, 0, 0).unwrap(),
            is_reported: false,
            reported_at: None,
            created_at: Utc::now(),
        }
    }

    fn template_with_sheets(dir: &Path) -> PathBuf {
        let mut book = umya_spreadsheet::new_file();
        for name in [SHEET_PROVIDER, SHEET_BUY_FX, SHEET_SELL_FX, SHEET_FCD] {
            book.new_sheet(name).unwrap();
        }
        // A template-computed cell the generator must leave alone
        book.get_sheet_by_name_mut(SHEET_BUY_FX)
            .unwrap()
            .get_cell_mut("D9")
            .set_formula("VLOOKUP(B9,Lookups!A:B,2,0)");

        std::fs::create_dir_all(dir).unwrap();
        let path = dir.join("bot_template.xlsx");
        writer::xlsx::write(&book, &path).unwrap();
        path
    }

    fn month_data() -> BotMonthData {
        BotMonthData {
            codes: codes(),
            ym: YearMonth::new(2025, 10).unwrap(),
            // Out of order on purpose; the generator must sort by time
            buy_fx: vec![fx_event(2, 14), fx_event(1, 9)],
            sell_fx: vec![fx_event(3, 11)],
            fcd: vec![fcd_event()],
        }
    }

    #[test]
    fn test_render_writes_provider_header_and_rows() {
        let base = std::env::temp_dir().join(format!("bot_render_{}", std::process::id()));
        let template = template_with_sheets(&base.join("templates"));
        let generator = BotExcelGenerator::new(&template, base.join("out"));

        let path = generator.render(&month_data()).unwrap();
        assert!(path.ends_with("2025/10/C001-202510.xlsx"));

        let book = reader::xlsx::read(&path).unwrap();
        let provider = book.get_sheet_by_name(SHEET_PROVIDER).unwrap();
        assert_eq!(provider.get_value("B2"), "001");
        assert_eq!(provider.get_value("B3"), "Siam Exchange Co., Ltd.");
        assert_eq!(provider.get_value("B7"), "ตุลาคม");
        assert_eq!(provider.get_value("B8"), "2568");
        assert_eq!(provider.get_value("B9"), "2025-10-31");

        // Buy FX rows start at row 9, ordered by event time: event 1 (09:00)
        // comes before event 2 (14:00) despite input order
        let buy = book.get_sheet_by_name(SHEET_BUY_FX).unwrap();
        assert_eq!(buy.get_value("A9"), "1");
        assert_eq!(buy.get_value("C9"), "Customer 1");
        assert_eq!(buy.get_value("A10"), "2");
        assert_eq!(buy.get_value("C10"), "Customer 2");
        assert_eq!(buy.get_value("B9"), "110");
        assert_eq!(buy.get_value("M9"), "USD");

        // Sequence restarts per sheet
        let sell = book.get_sheet_by_name(SHEET_SELL_FX).unwrap();
        assert_eq!(sell.get_value("A9"), "1");
        assert_eq!(sell.get_value("C9"), "Customer 3");

        // FCD rows start at row 8 with Buddhist-era date parts
        let fcd = book.get_sheet_by_name(SHEET_FCD).unwrap();
        assert_eq!(fcd.get_value("A8"), "1");
        assert_eq!(fcd.get_value("B8"), "2568");
        assert_eq!(fcd.get_value("C8"), "10");
        assert_eq!(fcd.get_value("D8"), "07");
        assert_eq!(fcd.get_value("E8"), "Krung Thai Bank");
    }

    #[test]
    fn test_formula_columns_untouched() {
        let base = std::env::temp_dir().join(format!("bot_formula_{}", std::process::id()));
        let template = template_with_sheets(&base.join("templates"));
        let generator = BotExcelGenerator::new(&template, base.join("out"));

        let path = generator.render(&month_data()).unwrap();
        let book = reader::xlsx::read(&path).unwrap();
        let buy = book.get_sheet_by_name(SHEET_BUY_FX).unwrap();

        // The template formula in a computed column survives the render
        assert_eq!(
            buy.get_cell("D9").unwrap().get_formula(),
            "VLOOKUP(B9,Lookups!A:B,2,0)"
        );
    }

    #[test]
    fn test_render_is_idempotent() {
        let base = std::env::temp_dir().join(format!("bot_idem_{}", std::process::id()));
        let template = template_with_sheets(&base.join("templates"));
        let generator = BotExcelGenerator::new(&template, base.join("out"));

        let first = generator.render(&month_data()).unwrap();
        let second = generator.render(&month_data()).unwrap();
        assert_eq!(first, second);

        let book = reader::xlsx::read(&second).unwrap();
        let buy = book.get_sheet_by_name(SHEET_BUY_FX).unwrap();
        assert_eq!(buy.get_value("A9"), "1");
        // No stray temp file left at the published path
        assert!(second.exists());
    }

    #[test]
    fn test_missing_template() {
        let generator = BotExcelGenerator::new("/nonexistent/template.xlsx", "/tmp/out");
        let err = generator.render(&month_data()).unwrap_err();
        assert!(matches!(err, ReportingError::TemplateMissing(_)));
    }

    #[test]
    fn test_provider_events_stay_off_the_workbook() {
        // Provider adjustments are persisted rows, not workbook lines; the
        // sheet carries the header block only. This pins the contract.
        let event = BotProviderEvent {
            id: BotEventId::new(),
            branch_id: BranchId::new(),
            adjustment_id: AdjustmentId::new(),
            currency_code: CurrencyCode::USD,
            delta_amount: dec!(25000),
            usd_equivalent: dec!(25000),
            remarks: None,
            event_time: Utc::now(),
            is_reported: false,
            reported_at: None,
            created_at: Utc::now(),
        };
        assert!(event.usd_equivalent >= dec!(20000));
    }
}
