// Type references that cross module, file and crate boundaries
use openapi_from_comments::generator::{generate, GeneratorOptions};
use openapi_from_comments::schema_generator::Schema;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn create_test_project(files: &[(&str, &str)]) -> TempDir {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    for (path, content) in files {
        let file_path = temp_dir.path().join(path);
        std::fs::create_dir_all(file_path.parent().unwrap()).unwrap();
        std::fs::write(&file_path, content).unwrap();
    }
    temp_dir
}

fn response_schema(doc: &openapi_from_comments::document::Document, path: &str) -> Schema {
    doc.operation(path, "get")
        .unwrap_or_else(|| panic!("missing GET {}", path))
        .responses["200"]
        .content["application/json"]
        .schema
        .clone()
        .expect("response schema")
}

fn property_ref(schema: &Schema, name: &str) -> Option<String> {
    schema.properties.as_ref()?.get(name)?.reference.clone()
}

#[test]
fn test_super_and_self_paths() {
    let temp_dir = create_test_project(&[
        ("lib.rs", "mod api;\nmod models;\n"),
        (
            "api/mod.rs",
            r#"
            mod orders;

            /// @openapi GET /orders/{id}
            /// @openapiParam id in=path, type=int
            /// @openapiResponse 200 application/json super::models::Order
            pub fn get_order() {}

            /// @openapi GET /receipts/{id}
            /// @openapiParam id in=path, type=int
            /// @openapiResponse 200 application/json self::orders::Receipt
            pub fn get_receipt() {}
            "#,
        ),
        (
            "api/orders/mod.rs",
            "pub struct Receipt { pub order: super::super::models::Order }",
        ),
        (
            "models/mod.rs",
            "pub struct Order { pub id: u64, pub lines: Vec<Line> }\npub struct Line { pub sku: String }",
        ),
    ]);

    let generation = generate(&GeneratorOptions::new(temp_dir.path())).unwrap();
    assert!(generation.errors.is_empty(), "{:?}", generation.errors);
    let doc = &generation.document;

    assert_eq!(
        response_schema(doc, "/orders/{id}").reference.as_deref(),
        Some("#/components/schemas/Order")
    );
    assert_eq!(
        response_schema(doc, "/receipts/{id}").reference.as_deref(),
        Some("#/components/schemas/Receipt")
    );
    let receipt = doc.schema("Receipt").unwrap();
    assert_eq!(
        property_ref(receipt, "order").as_deref(),
        Some("#/components/schemas/Order")
    );
    assert!(doc.schema("Line").is_some());
}

#[test]
fn test_file_modules_are_separate_namespaces() {
    let temp_dir = create_test_project(&[
        ("lib.rs", "mod dto;\nmod routes;\n"),
        (
            "dto.rs",
            "pub struct Health { pub status: String }\npub struct Error { pub code: u16 }",
        ),
        (
            "routes.rs",
            r#"
            use crate::dto::Health;

            pub struct Error { pub message: String }

            /// @openapi GET /health
            /// @openapiResponse 200 application/json Health
            /// @openapiResponse 500 application/json crate::dto::Error
            /// @openapiResponse 503 application/json Error
            pub fn health() {}
            "#,
        ),
    ]);

    let generation = generate(&GeneratorOptions::new(temp_dir.path())).unwrap();

    assert!(generation.errors.is_empty(), "{:?}", generation.errors);
    assert_eq!(generation.units_scanned, 3);
    let doc = &generation.document;
    assert!(doc.schema("Health").is_some());

    let responses = &doc.operation("/health", "get").unwrap().responses;
    let schema_ref = |code: &str| {
        responses[code].content["application/json"]
            .schema
            .as_ref()
            .and_then(|s| s.reference.clone())
    };
    assert_eq!(schema_ref("500").as_deref(), Some("#/components/schemas/Error"));
    assert_eq!(schema_ref("503").as_deref(), Some("#/components/schemas/routes.Error"));
    assert!(doc
        .schema("Error")
        .unwrap()
        .properties
        .as_ref()
        .unwrap()
        .contains_key("code"));
    assert!(doc
        .schema("routes.Error")
        .unwrap()
        .properties
        .as_ref()
        .unwrap()
        .contains_key("message"));
}

#[test]
fn test_reexport_chain_and_inline_module() {
    let temp_dir = create_test_project(&[
        (
            "lib.rs",
            r#"
            mod domain;
            mod prelude;
            use prelude::Order;

            pub mod api {
                use super::Order;

                pub struct Receipt { pub order: Order, pub total: f64 }

                /// @openapi GET /receipts/{id}
                /// @openapiParam id in=path, type=int
                /// @openapiResponse 200 application/json Receipt
                pub fn receipt() {}
            }

            /// @openapi GET /orders/{id}
            /// @openapiParam id in=path, type=int
            /// @openapiResponse 200 application/json Order
            pub fn order() {}
            "#,
        ),
        ("prelude.rs", "pub use crate::domain::Order;"),
        ("domain/mod.rs", "pub struct Order { pub id: u64 }"),
    ]);

    let generation = generate(&GeneratorOptions::new(temp_dir.path())).unwrap();

    assert!(generation.errors.is_empty(), "{:?}", generation.errors);
    let doc = &generation.document;
    assert_eq!(
        response_schema(doc, "/orders/{id}").reference.as_deref(),
        Some("#/components/schemas/Order")
    );
    assert_eq!(
        response_schema(doc, "/receipts/{id}").reference.as_deref(),
        Some("#/components/schemas/Receipt")
    );
    assert_eq!(
        property_ref(doc.schema("Receipt").unwrap(), "order").as_deref(),
        Some("#/components/schemas/Order")
    );
}

#[test]
fn test_glob_import_fallback() {
    let temp_dir = create_test_project(&[
        (
            "lib.rs",
            r#"
            mod shared;
            use shared::*;

            /// @openapi GET /money
            /// @openapiResponse 200 application/json Money
            pub fn money() {}
            "#,
        ),
        ("shared/mod.rs", "pub struct Money { pub cents: i64 }"),
    ]);

    let generation = generate(&GeneratorOptions::new(temp_dir.path())).unwrap();

    assert!(generation.errors.is_empty(), "{:?}", generation.errors);
    let money = generation.document.schema("Money").unwrap();
    assert_eq!(
        money.properties.as_ref().unwrap()["cents"].format.as_deref(),
        Some("int64")
    );
}

#[test]
fn test_crate_name_and_extern_crates() {
    let shared = create_test_project(&[
        ("lib.rs", "pub mod currency;\n"),
        (
            "currency/mod.rs",
            "pub struct Money { pub cents: i64, pub code: Code }\npub enum Code { Eur, Usd }",
        ),
    ]);
    let app = create_test_project(&[
        (
            "lib.rs",
            r#"
            mod models;

            /// @openapi GET /wallet
            /// @openapiResponse 200 application/json shop_api::models::Wallet
            pub fn wallet() {}
            "#,
        ),
        (
            "models/mod.rs",
            r#"
            pub struct Wallet {
                pub balance: shared_types::currency::Money,
                pub history: Vec<shared_types::currency::Money>,
                pub pocket: Money,
            }

            /// Local money, unrelated to the shared one
            pub struct Money {
                pub amount: f32,
            }

            /// @openapi GET /local-money
            /// @openapiResponse 200 application/json self::Money
            pub fn local_money() {}
            "#,
        ),
    ]);

    let mut options = GeneratorOptions::new(app.path());
    options.crate_name = Some("shop-api".to_string());
    options
        .extern_crates
        .push(("shared-types".to_string(), shared.path().to_path_buf()));
    let generation = generate(&options).unwrap();

    assert!(generation.errors.is_empty(), "{:?}", generation.errors);
    let doc = &generation.document;
    let wallet = doc.schema("Wallet").unwrap();

    // The shared type is registered first and keeps the bare name
    assert_eq!(
        property_ref(wallet, "balance").as_deref(),
        Some("#/components/schemas/Money")
    );
    assert_eq!(
        property_ref(wallet, "pocket").as_deref(),
        Some("#/components/schemas/models.Money")
    );
    let shared_money = doc.schema("Money").unwrap();
    assert!(shared_money.properties.as_ref().unwrap().contains_key("cents"));
    assert_eq!(
        doc.schema("Code").unwrap().enum_values,
        Some(vec!["Eur".to_string(), "Usd".to_string()])
    );

    let local = response_schema(doc, "/local-money");
    assert_eq!(
        local.reference.as_deref(),
        Some("#/components/schemas/models.Money")
    );
    assert!(doc
        .schema("models.Money")
        .unwrap()
        .properties
        .as_ref()
        .unwrap()
        .contains_key("amount"));
}

#[test]
fn test_unresolved_module_is_reported() {
    let temp_dir = create_test_project(&[(
        "lib.rs",
        r#"
        /// @openapi GET /nowhere
        /// @openapiResponse 200 application/json nowhere::Thing
        pub fn nowhere() {}

        /// @openapi GET /missing-dir
        /// @openapiResponse 200 application/json crate::gone::Thing
        pub fn missing_dir() {}
        "#,
    )]);

    let generation = generate(&GeneratorOptions::new(temp_dir.path())).unwrap();
    let messages: Vec<String> = generation
        .errors
        .iter()
        .map(|e| e.error.to_string())
        .collect();

    assert_eq!(
        messages[0],
        "not found import path for package 'nowhere' in 'crate'"
    );
    assert!(
        messages[1].starts_with("file system path for 'crate::gone' not found from "),
        "{}",
        messages[1]
    );
    assert!(generation.document.paths.is_empty());
}
