//! Reporting domain - regulator-facing records and filing artifacts
//!
//! Everything a filing needs after the compliance engine has spoken: the
//! gap-free report-number format both regulators key on, the AMLO report and
//! BOT event records, the schema-driven form-field validation, and the two
//! artifact generators (AMLO PDF forms, the monthly BOT workbook).

pub mod amlo_pdf;
pub mod bot_excel;
pub mod error;
pub mod fields;
pub mod number;
pub mod report;
pub mod thai;

pub use amlo_pdf::AmloPdfGenerator;
pub use bot_excel::{BotExcelGenerator, BotMonthData};
pub use error::{FieldViolation, ReportingError};
pub use fields::{DataType, FieldConstraints, FieldDefinition, validate_form};
pub use number::{BranchCodes, ReportNumber};
pub use report::{
    AmloReport, BotClassifier, BotFcdEvent, BotFxEvent, BotProviderEvent, CustomerTypeCode,
    IdType,
};
