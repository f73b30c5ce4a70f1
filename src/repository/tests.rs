//! Repository Integration Tests
//!
//! The same contract, run against every backend.

#[cfg(test)]
mod tests {
    use crate::domain::{Contact, Field, FieldType, Form, Group, Locale, NpsResponse, DomainError};
    use crate::domain::ordering::is_dense;
    use crate::repository::{
        init_db, CampaignScopedRepository, ContactRepository, FileKv, FormGateway, KeyValueStore, LocalFormStore,
        MemoryKv, Repository, SqliteFormStore,
    };

    fn sample_form(campaign_id: &str) -> Form {
        let mut nps = Field::default_nps(&Locale::En);
        nps.order = 0;
        let mut text = Field::new(FieldType::Text, 1, &Locale::En);
        text.label = "Anything else?".to_string();
        let radio = Field::new(FieldType::Radio, 2, &Locale::En);
        Form::new(campaign_id, vec![nps, text, radio])
    }

    async fn check_round_trip<S: FormGateway>(store: &S) {
        let form = sample_form("campaign-1");
        store.save(&form).await.expect("Save failed");

        let loaded = store.load("campaign-1").await.expect("Load failed").expect("Form missing");
        assert_eq!(loaded, form);
    }

    async fn check_missing_form<S: FormGateway>(store: &S) {
        assert!(store.load("nobody").await.expect("Load failed").is_none());
    }

    async fn check_save_normalizes_order<S: FormGateway>(store: &S) {
        let mut form = sample_form("campaign-2");
        form.fields[0].order = 9;
        form.fields[1].order = 4;
        form.fields[2].order = 4;
        let expected_ids = vec![
            form.fields[1].id.clone(),
            form.fields[2].id.clone(),
            form.fields[0].id.clone(),
        ];

        let saved = store.save(&form).await.expect("Save failed");
        let loaded = store.load("campaign-2").await.unwrap().unwrap();

        for stored in [&saved, &loaded] {
            let ids: Vec<String> = stored.fields.iter().map(|f| f.id.clone()).collect();
            assert_eq!(ids, expected_ids);
            assert!(is_dense(&stored.fields));
        }
    }

    async fn check_save_upserts<S: FormGateway>(store: &S) {
        let mut form = sample_form("campaign-3");
        store.save(&form).await.unwrap();

        form.fields.pop();
        form.fields[1].label = "Changed".to_string();
        store.save(&form).await.unwrap();

        let loaded = store.load("campaign-3").await.unwrap().unwrap();
        assert_eq!(loaded.fields.len(), 2);
        assert_eq!(loaded.fields[1].label, "Changed");
    }

    async fn check_delete_cascades<S>(store: &S)
    where
        S: FormGateway + CampaignScopedRepository<NpsResponse>,
    {
        store.save(&sample_form("doomed")).await.unwrap();
        store.save(&sample_form("kept")).await.unwrap();
        store.create(&NpsResponse::new("doomed", 9).unwrap()).await.unwrap();
        store.create(&NpsResponse::new("doomed", 2).unwrap()).await.unwrap();
        let survivor = store.create(&NpsResponse::new("kept", 7).unwrap()).await.unwrap();

        store.delete_campaign("doomed").await.expect("Delete failed");

        assert!(store.load("doomed").await.unwrap().is_none());
        assert!(store.list_by_campaign("doomed").await.unwrap().is_empty());
        assert!(store.load("kept").await.unwrap().is_some());
        assert_eq!(store.list().await.unwrap(), vec![survivor]);
    }

    async fn check_response_crud<S: CampaignScopedRepository<NpsResponse>>(store: &S) {
        let response = NpsResponse::new("c1", 10)
            .unwrap()
            .with_feedback("Great")
            .with_answer("field-1", serde_json::json!("Option 2"));
        let created = store.create(&response).await.expect("Create failed");
        assert_eq!(created, response);

        let duplicate = store.create(&response).await;
        assert!(matches!(duplicate, Err(DomainError::Conflict(_))));

        let found = store.find_by_id(&response.id).await.unwrap();
        assert_eq!(found, Some(response.clone()));

        let mut changed = response.clone();
        changed.score = 4;
        store.update(&changed).await.expect("Update failed");
        assert_eq!(store.find_by_id(&response.id).await.unwrap().unwrap().score, 4);

        let stranger = NpsResponse::new("c1", 1).unwrap();
        assert!(matches!(store.update(&stranger).await, Err(DomainError::NotFound(_))));

        store.create(&NpsResponse::new("c2", 8).unwrap()).await.unwrap();
        assert_eq!(store.list_by_campaign("c1").await.unwrap().len(), 1);
        assert_eq!(store.list().await.unwrap().len(), 2);

        store.delete(&response.id).await.expect("Delete failed");
        assert!(store.find_by_id(&response.id).await.unwrap().is_none());
    }

    async fn check_rejects_out_of_range_score<S: CampaignScopedRepository<NpsResponse>>(store: &S) {
        let mut response = NpsResponse::new("c1", 6).unwrap();
        response.score = 200;
        assert!(matches!(store.create(&response).await, Err(DomainError::InvalidInput(_))));
        assert!(store.list().await.unwrap().is_empty());

        response.score = 6;
        store.create(&response).await.unwrap();
        response.score = 11;
        assert!(matches!(store.update(&response).await, Err(DomainError::InvalidInput(_))));
        assert_eq!(store.find_by_id(&response.id).await.unwrap().unwrap().score, 6);
    }

    fn contact(name: &str, phone: &str, groups: &[&str]) -> Contact {
        let mut contact = Contact::new(name, format!("{}@example.com", name.to_lowercase()), phone);
        contact.group_ids = groups.iter().map(|g| g.to_string()).collect();
        contact
    }

    async fn check_contact_crud<S: ContactRepository>(store: &S) {
        let mut ana = contact("Ana", "1111", &["g1"]);
        ana.company = Some("Acme".to_string());
        ana.tags = vec!["vip".to_string()];
        ana.notes = Some("Prefers email".to_string());

        assert_eq!(store.create(&ana).await.expect("Create failed"), ana);
        assert!(matches!(store.create(&ana).await, Err(DomainError::Conflict(_))));
        assert_eq!(store.find_by_id(&ana.id).await.unwrap(), Some(ana.clone()));

        ana.position = Some("CTO".to_string());
        ana.group_ids.push("g2".to_string());
        ana.touch();
        store.update(&ana).await.expect("Update failed");
        assert_eq!(store.find_by_id(&ana.id).await.unwrap(), Some(ana.clone()));

        let stranger = contact("Nobody", "0", &[]);
        assert!(matches!(store.update(&stranger).await, Err(DomainError::NotFound(_))));

        store.delete(&ana.id).await.expect("Delete failed");
        assert!(store.find_by_id(&ana.id).await.unwrap().is_none());
        assert!(store.list().await.unwrap().is_empty());
    }

    async fn check_contact_lookups<S: ContactRepository>(store: &S) {
        let ana = store.create(&contact("Ana", "1111", &["g1", "g2"])).await.unwrap();
        let bruno = store.create(&contact("Bruno", "2222", &["g2"])).await.unwrap();
        let mut carla = contact("Carla", "3333", &[]);
        carla.tags = vec!["Beta".to_string()];
        let carla = store.create(&carla).await.unwrap();

        assert_eq!(store.list_by_group("g1").await.unwrap(), vec![ana.clone()]);
        assert_eq!(store.list_by_group("g2").await.unwrap(), vec![ana.clone(), bruno.clone()]);
        assert!(store.list_by_group("g").await.unwrap().is_empty());

        assert_eq!(store.search("BRUNO").await.unwrap(), vec![bruno.clone()]);
        assert_eq!(store.search("beta").await.unwrap(), vec![carla.clone()]);
        assert_eq!(store.search("333").await.unwrap(), vec![carla]);
        assert_eq!(store.search("example.com").await.unwrap().len(), 3);
        assert!(store.search("zzz").await.unwrap().is_empty());
    }

    async fn check_group_crud<S: Repository<Group>>(store: &S) {
        let mut premium = Group::new("Premium");
        let internal = Group::new("Internal");
        store.create(&premium).await.expect("Create failed");
        store.create(&internal).await.unwrap();
        assert!(matches!(store.create(&premium).await, Err(DomainError::Conflict(_))));

        premium.name = "Premium customers".to_string();
        store.update(&premium).await.expect("Update failed");
        assert_eq!(store.list().await.unwrap(), vec![premium.clone(), internal.clone()]);
        assert!(matches!(
            store.update(&Group::new("Ghost")).await,
            Err(DomainError::NotFound(_))
        ));

        store.delete(&internal.id).await.unwrap();
        assert!(store.find_by_id(&internal.id).await.unwrap().is_none());
        assert_eq!(store.find_by_id(&premium.id).await.unwrap(), Some(premium));
    }

    async fn check_all<S>(mut make: impl FnMut() -> S)
    where
        S: FormGateway + CampaignScopedRepository<NpsResponse> + ContactRepository + Repository<Group>,
    {
        check_round_trip(&make()).await;
        check_missing_form(&make()).await;
        check_save_normalizes_order(&make()).await;
        check_save_upserts(&make()).await;
        check_delete_cascades(&make()).await;
        check_response_crud(&make()).await;
        check_rejects_out_of_range_score(&make()).await;
        check_contact_crud(&make()).await;
        check_contact_lookups(&make()).await;
        check_group_crud(&make()).await;
    }

    #[tokio::test]
    async fn test_memory_backend() {
        check_all(|| LocalFormStore::new(MemoryKv::new(), "nps")).await;
    }

    #[tokio::test]
    async fn test_file_backend() {
        let dir = tempfile::tempdir().unwrap();
        let mut n = 0;
        let root = dir.path().to_path_buf();
        let make = move || {
            n += 1;
            LocalFormStore::new(FileKv::open(root.join(format!("kv{}", n))).unwrap(), "nps")
        };
        check_all(make).await;
    }

    #[tokio::test]
    async fn test_sqlite_backend() {
        check_all(|| SqliteFormStore::in_memory().expect("Failed to init test DB")).await;
    }

    #[tokio::test]
    async fn test_file_backend_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let form = sample_form("campaign-1");

        LocalFormStore::new(FileKv::open(dir.path()).unwrap(), "nps")
            .save(&form)
            .await
            .unwrap();

        let reopened = LocalFormStore::new(FileKv::open(dir.path()).unwrap(), "nps");
        assert_eq!(reopened.load("campaign-1").await.unwrap(), Some(form));
    }

    #[tokio::test]
    async fn test_sqlite_persists_across_connections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forms.db");
        let form = sample_form("campaign-1");

        SqliteFormStore::open(&path).unwrap().save(&form).await.unwrap();

        let reopened = SqliteFormStore::open(&path).unwrap();
        assert_eq!(reopened.load("campaign-1").await.unwrap(), Some(form));
    }

    #[tokio::test]
    async fn test_namespaces_are_isolated() {
        let kv = std::sync::Arc::new(MemoryKv::new());
        let first = LocalFormStore::new(SharedKv(kv.clone()), "first");
        let second = LocalFormStore::new(SharedKv(kv), "second");

        first.save(&sample_form("campaign-1")).await.unwrap();

        assert!(second.load("campaign-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_repairs_legacy_local_data() {
        let kv = MemoryKv::new();
        kv.set(
            "nps/forms_old",
            r#"{"id":"f","campaignId":"old","fields":[
                {"id":"b","type":"text","label":"B","required":false},
                {"id":"a","type":"nps","label":"A","required":true,"order":0}
            ]}"#,
        )
        .unwrap();
        let store = LocalFormStore::new(kv, "nps");

        let form = store.load("old").await.unwrap().unwrap();

        // "b" had no order and takes its position (0), tying with "a"; the tie keeps list order
        let ids: Vec<&str> = form.fields.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert!(is_dense(&form.fields));
    }

    const ODD_ORDERS: &str = r#"[
        {"id":"late","type":"text","label":"Late","required":false,"order":1.5},
        {"id":"first","type":"nps","label":"Score","required":true,"order":-3},
        {"id":"unset","type":"radio","label":"Pick","required":false,"options":["x"],"order":null}
    ]"#;

    fn assert_odd_orders_repaired(form: &Form) {
        // first(-3) late(1.5) unset(2, its position)
        let ids: Vec<&str> = form.fields.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "late", "unset"]);
        assert!(is_dense(&form.fields));
    }

    #[tokio::test]
    async fn test_local_backend_repairs_non_integer_orders() {
        let kv = MemoryKv::new();
        kv.set(
            "nps/forms_odd",
            &format!(r#"{{"id":"f","campaignId":"odd","fields":{}}}"#, ODD_ORDERS),
        )
        .unwrap();
        let store = LocalFormStore::new(kv, "nps");

        let form = store.load("odd").await.expect("Load failed").unwrap();
        assert_odd_orders_repaired(&form);

        // The repaired form saves back in canonical shape
        store.save(&form).await.unwrap();
        assert_eq!(store.load("odd").await.unwrap(), Some(form));
    }

    #[tokio::test]
    async fn test_sqlite_backend_repairs_non_integer_orders() {
        let conn = init_db(std::path::Path::new(":memory:")).expect("Failed to init test DB");
        conn.execute(
            "INSERT INTO campaign_forms (campaign_id, id, fields, updated_at) VALUES (?1, ?2, ?3, 0)",
            rusqlite::params!["odd", "f", ODD_ORDERS],
        )
        .unwrap();
        let store = SqliteFormStore::new(std::sync::Arc::new(tokio::sync::Mutex::new(conn)));

        let form = store.load("odd").await.expect("Load failed").unwrap();
        assert_odd_orders_repaired(&form);

        store.save(&form).await.unwrap();
        assert_eq!(store.load("odd").await.unwrap(), Some(form));
    }

    #[tokio::test]
    async fn test_local_delete_keeps_form_when_responses_are_corrupt() {
        let kv = MemoryKv::new();
        kv.set("nps/responses", "[{not json").unwrap();
        let store = LocalFormStore::new(kv, "nps");
        store.save(&sample_form("c1")).await.unwrap();

        assert!(store.delete_campaign("c1").await.is_err());
        assert!(store.load("c1").await.unwrap().is_some());
    }

    struct SharedKv(std::sync::Arc<MemoryKv>);

    impl KeyValueStore for SharedKv {
        fn get(&self, key: &str) -> crate::domain::DomainResult<Option<String>> {
            self.0.get(key)
        }

        fn set(&self, key: &str, value: &str) -> crate::domain::DomainResult<()> {
            self.0.set(key, value)
        }

        fn remove(&self, key: &str) -> crate::domain::DomainResult<()> {
            self.0.remove(key)
        }
    }
}
