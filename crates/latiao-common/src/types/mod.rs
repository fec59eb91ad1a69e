//! Core type definitions for LaTiao.
//!
//! - Identifier types ([`FieldId`], [`ProgramId`])
//! - Field and column types ([`FieldToken`], [`FieldMode`], [`Column`], [`ColumnData`])
//! - Calendar dimensions ([`DateDimension`], [`DateDimensions`])
//! - The token model flowing through parser, resolver and operators ([`Token`], [`TokenType`])

mod column;
mod date;
mod field;
mod id;
mod token;

pub use column::{Column, ColumnData};
pub use date::{DateDimension, DateDimensions};
pub use field::{AnalyticType, DateExpansion, ExtDetail, ExtInfo, FieldMode, FieldToken, SemanticType};
pub use id::{DERIVED_FID_PREFIX, FieldId, ProgramId};
pub use token::{DateToken, Export, OpToken, Token, TokenType};
