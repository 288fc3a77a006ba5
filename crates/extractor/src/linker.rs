//! Linking extracted notices to person records

use crate::names::name_key;
use crate::notices::ExtractedNotice;
use crate::store::RegistryStore;
use chrono::NaiveDate;
use gazette_common::db::models::NoticeKind;
use gazette_common::db::NewPerson;
use gazette_common::errors::Result;
use tracing::debug;
use uuid::Uuid;

/// Find or create the person a notice is about and record what it says.
///
/// Lookup tries the subject's name, then its aliases, then the new name.
/// Every name involved is registered against the person.
pub async fn link_person<S>(store: &S, notice: &ExtractedNotice) -> Result<Uuid>
where
    S: RegistryStore + ?Sized,
{
    let names: Vec<(&str, String)> = notice
        .all_names()
        .into_iter()
        .map(|name| (name, name_key(name)))
        .filter(|(_, key)| !key.is_empty())
        .collect();

    let mut existing = None;
    for (_, key) in &names {
        if let Some(id) = store.find_person_by_key(key).await? {
            existing = Some(id);
            break;
        }
    }

    let (dob, pob) = birth_details(notice);

    let person_id = match existing {
        Some(id) => {
            apply_to_existing(store, id, notice, dob, pob).await?;
            debug!(person_id = %id, name = %notice.name, "Linked notice to existing person");
            id
        }
        None => {
            let id = store
                .create_person(NewPerson {
                    full_name: current_name(notice).to_string(),
                    title: notice.new_title.or(notice.title).map(|t| t.as_str().to_string()),
                    gender: notice.gender,
                    date_of_birth: dob,
                    place_of_birth: pob,
                })
                .await?;
            debug!(person_id = %id, name = %notice.name, "Created person for notice");
            id
        }
    };

    for (name, key) in &names {
        store.add_person_name(person_id, name, key).await?;
    }

    Ok(person_id)
}

async fn apply_to_existing<S>(
    store: &S,
    person_id: Uuid,
    notice: &ExtractedNotice,
    dob: Option<NaiveDate>,
    pob: Option<String>,
) -> Result<()>
where
    S: RegistryStore + ?Sized,
{
    match notice.kind {
        NoticeKind::ChangeOfName => {
            if let Some(new_name) = &notice.new_name {
                let title = notice.new_title.map(|t| t.as_str().to_string());
                store.rename_person(person_id, new_name, title).await?;
            }
        }
        NoticeKind::ChangeOfDateOfBirth | NoticeKind::ChangeOfPlaceOfBirth => {
            if dob.is_some() || pob.is_some() {
                store.update_birth_details(person_id, dob, pob).await?;
            }
        }
        NoticeKind::MarriageOfficer => {}
    }
    Ok(())
}

/// The name the person goes by once the notice takes effect
fn current_name(notice: &ExtractedNotice) -> &str {
    match (&notice.kind, &notice.new_name) {
        (NoticeKind::ChangeOfName, Some(new_name)) => new_name,
        _ => &notice.name,
    }
}

fn birth_details(notice: &ExtractedNotice) -> (Option<NaiveDate>, Option<String>) {
    match notice.kind {
        NoticeKind::ChangeOfDateOfBirth => {
            let dob = notice.new_value.as_deref().and_then(|v| v.parse().ok());
            (dob, None)
        }
        NoticeKind::ChangeOfPlaceOfBirth => (None, notice.new_value.clone()),
        _ => (None, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::RawItem;
    use crate::notices::parse_notice;
    use crate::store::MemoryStore;

    fn notice(kind: NoticeKind, text: &str) -> ExtractedNotice {
        let item = RawItem { number: Some(1), text: text.to_string() };
        parse_notice(kind, &item).unwrap()
    }

    #[tokio::test]
    async fn test_change_of_name_creates_person_under_new_name() {
        let store = MemoryStore::new();
        let n = notice(
            NoticeKind::ChangeOfName,
            "Miss Ama Serwaa a.k.a. Ama Boatemaa wishes to be known as Mrs. Ama Serwaa Owusu.",
        );

        let id = link_person(&store, &n).await.unwrap();
        let person = store.person(id).await.unwrap();

        assert_eq!(person.full_name, "Ama Serwaa Owusu");
        assert_eq!(person.title.as_deref(), Some("Mrs."));
        assert_eq!(person.names, vec!["Ama Serwaa", "Ama Boatemaa", "Ama Serwaa Owusu"]);
    }

    #[tokio::test]
    async fn test_later_notice_under_new_name_finds_same_person() {
        let store = MemoryStore::new();
        let renamed = notice(
            NoticeKind::ChangeOfName,
            "Mr. Kofi Ato wishes to be known as Kofi Mensah.",
        );
        let first = link_person(&store, &renamed).await.unwrap();

        let dob = notice(
            NoticeKind::ChangeOfDateOfBirth,
            "Mr. Mensah Kofi wishes to confirm that his date of birth is 5th April, 1990 and not 5th April, 1991.",
        );
        let second = link_person(&store, &dob).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.people().await.len(), 1);

        let person = store.person(first).await.unwrap();
        assert_eq!(person.full_name, "Kofi Mensah");
        assert_eq!(person.date_of_birth, NaiveDate::from_ymd_opt(1990, 4, 5));
        assert_eq!(person.names, vec!["Kofi Ato", "Kofi Mensah"]);
    }

    #[tokio::test]
    async fn test_change_of_name_renames_existing_person() {
        let store = MemoryStore::new();
        let pob = notice(
            NoticeKind::ChangeOfPlaceOfBirth,
            "Mr. Yaw Boakye wishes to confirm that his place of birth is Ho and not Tema.",
        );
        let id = link_person(&store, &pob).await.unwrap();
        assert_eq!(store.person(id).await.unwrap().place_of_birth.as_deref(), Some("Ho"));

        let renamed = notice(
            NoticeKind::ChangeOfName,
            "Mr. Yaw Boakye wishes to be known and called Dr. Yaw Boakye-Ansah.",
        );
        assert_eq!(link_person(&store, &renamed).await.unwrap(), id);

        let person = store.person(id).await.unwrap();
        assert_eq!(person.full_name, "Yaw Boakye-Ansah");
        assert_eq!(person.title.as_deref(), Some("Dr."));
        assert_eq!(person.place_of_birth.as_deref(), Some("Ho"));
    }
}
