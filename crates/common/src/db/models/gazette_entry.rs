//! Gazette entry entity: one extracted notice

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Category of gazette notice
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    ChangeOfName,
    ChangeOfDateOfBirth,
    ChangeOfPlaceOfBirth,
    MarriageOfficer,
}

impl NoticeKind {
    pub const ALL: [NoticeKind; 4] = [
        NoticeKind::ChangeOfName,
        NoticeKind::ChangeOfDateOfBirth,
        NoticeKind::ChangeOfPlaceOfBirth,
        NoticeKind::MarriageOfficer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NoticeKind::ChangeOfName => "change_of_name",
            NoticeKind::ChangeOfDateOfBirth => "change_of_date_of_birth",
            NoticeKind::ChangeOfPlaceOfBirth => "change_of_place_of_birth",
            NoticeKind::MarriageOfficer => "marriage_officer",
        }
    }

    /// Human readable label used in assistant answers
    pub fn label(&self) -> &'static str {
        match self {
            NoticeKind::ChangeOfName => "change of name",
            NoticeKind::ChangeOfDateOfBirth => "change of date of birth",
            NoticeKind::ChangeOfPlaceOfBirth => "change of place of birth",
            NoticeKind::MarriageOfficer => "marriage officer appointment",
        }
    }
}

impl fmt::Display for NoticeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NoticeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NoticeKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown notice kind: {}", s))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "gazette_entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub kind: String,

    pub item_number: Option<i32>,

    #[sea_orm(column_type = "Text", nullable)]
    pub gazette_number: Option<String>,

    pub gazette_date: Option<Date>,

    pub person_id: Option<Uuid>,

    #[sea_orm(column_type = "Text", nullable)]
    pub title: Option<String>,

    /// Subject's name as printed (the former name for a change of name)
    #[sea_orm(column_type = "Text")]
    pub name: String,

    /// JSON array of alternative names
    #[sea_orm(column_type = "JsonBinary")]
    pub aliases: serde_json::Value,

    #[sea_orm(column_type = "Text")]
    pub gender: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub new_name: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub new_title: Option<String>,

    pub effective_date: Option<Date>,

    #[sea_orm(column_type = "Text", nullable)]
    pub old_value: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub new_value: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub profession: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub church: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub location: Option<String>,

    #[sea_orm(column_type = "Text")]
    pub raw_text: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub source: Option<String>,

    /// Lower-cased concatenation of the searchable fields
    #[sea_orm(column_type = "Text")]
    pub search_text: String,

    #[sea_orm(column_type = "Text", unique)]
    pub dedup_key: String,

    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn notice_kind(&self) -> Option<NoticeKind> {
        self.kind.parse().ok()
    }

    pub fn alias_list(&self) -> Vec<String> {
        serde_json::from_value(self.aliases.clone()).unwrap_or_default()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::person::Entity",
        from = "Column::PersonId",
        to = "super::person::Column::Id",
        on_delete = "SetNull"
    )]
    Person,
}

impl Related<super::person::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Person.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
