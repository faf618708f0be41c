//! Destination statements for each record type
//!
//! Date columns are plain text holding the normalized source string.

use super::{PositionalStatement, UpsertRecord};
use crate::models::{CategoryRecord, FormDataRecord, FormRecord};

const CATEGORY_UPDATE: &str = "UPDATE clip_form_category SET name = $1, status = $2 WHERE code = $3";

const CATEGORY_INSERT: &str =
    "INSERT INTO clip_form_category (code, name, status) VALUES ($1, $2, $3)";

const FORM_UPDATE: &str = "UPDATE clip_form SET category_code = $1, form_name = $2, \
     description = $3, create_date = $4, create_user_id = $5, update_date = $6, \
     update_user_id = $7 WHERE form_id = $8";

const FORM_INSERT: &str = "INSERT INTO clip_form (form_id, category_code, form_name, \
     description, create_date, create_user_id, update_date, update_user_id) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8)";

const FORM_DATA_UPDATE: &str = "UPDATE clip_form_data SET form_data = $1, product_id = $2, \
     create_date = $3, create_user_id = $4, update_date = $5, update_user_id = $6 \
     WHERE form_id = $7";

const FORM_DATA_INSERT: &str = "INSERT INTO clip_form_data (form_id, product_id, form_data, \
     create_date, create_user_id, update_date, update_user_id) \
     VALUES ($1, $2, $3, $4, $5, $6, $7)";

impl UpsertRecord for CategoryRecord {
    fn update_statement(&self) -> PositionalStatement {
        PositionalStatement::new(CATEGORY_UPDATE)
            .set_text(1, self.name.as_deref())
            .set_text(2, self.status.as_deref())
            .set_text(3, Some(self.code.as_str()))
    }

    fn insert_statement(&self) -> PositionalStatement {
        PositionalStatement::new(CATEGORY_INSERT)
            .set_text(1, Some(self.code.as_str()))
            .set_text(2, self.name.as_deref())
            .set_text(3, self.status.as_deref())
    }

    fn identifiers(&self) -> String {
        format!("code={}", self.code)
    }
}

impl UpsertRecord for FormRecord {
    fn update_statement(&self) -> PositionalStatement {
        PositionalStatement::new(FORM_UPDATE)
            .set_text(1, self.category_code.as_deref())
            .set_text(2, self.form_name.as_deref())
            .set_text(3, self.description.as_deref())
            .set_date(4, self.create_date.as_deref())
            .set_text(5, self.create_user_id.as_deref())
            .set_date(6, self.update_date.as_deref())
            .set_text(7, self.update_user_id.as_deref())
            .set_long(8, self.form_id)
    }

    fn insert_statement(&self) -> PositionalStatement {
        PositionalStatement::new(FORM_INSERT)
            .set_long(1, self.form_id)
            .set_text(2, self.category_code.as_deref())
            .set_text(3, self.form_name.as_deref())
            .set_text(4, self.description.as_deref())
            .set_date(5, self.create_date.as_deref())
            .set_text(6, self.create_user_id.as_deref())
            .set_date(7, self.update_date.as_deref())
            .set_text(8, self.update_user_id.as_deref())
    }

    fn identifiers(&self) -> String {
        format!("formId={}", self.form_id)
    }
}

impl UpsertRecord for FormDataRecord {
    fn update_statement(&self) -> PositionalStatement {
        PositionalStatement::new(FORM_DATA_UPDATE)
            .set_bytes(1, self.form_data.as_deref())
            .set_text(2, self.product_id.as_deref())
            .set_date(3, self.create_date.as_deref())
            .set_text(4, self.create_user_id.as_deref())
            .set_date(5, self.update_date.as_deref())
            .set_text(6, self.update_user_id.as_deref())
            .set_long(7, self.form_id)
    }

    fn insert_statement(&self) -> PositionalStatement {
        PositionalStatement::new(FORM_DATA_INSERT)
            .set_long(1, self.form_id)
            .set_text(2, self.product_id.as_deref())
            .set_bytes(3, self.form_data.as_deref())
            .set_date(4, self.create_date.as_deref())
            .set_text(5, self.create_user_id.as_deref())
            .set_date(6, self.update_date.as_deref())
            .set_text(7, self.update_user_id.as_deref())
    }

    fn identifiers(&self) -> String {
        format!(
            "productId={}, formId={}",
            self.product_id.as_deref().unwrap_or(""),
            self.form_id
        )
    }
}
