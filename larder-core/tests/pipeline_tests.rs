//! End-to-end tests for the prompt and request pipeline.
//!
//! Templates come from `fixtures/prompts/`; backends are in-memory, so nothing
//! here touches the network.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use larder_core::ai::prompts::{
    BpeTokenizer, ComposeError, ImagePromptComposer, PromptComposer, TemplateLoader, TokenBudget,
};
use larder_core::ai::{
    extract_recipes, AiConfig, AuditLog, BackendError, CompletionBackend, CompletionRequest,
    DispatchError, LogEntry, RequestDispatcher, RequestRecord, ResponseRecord, RetryPolicy, Role,
};
use larder_core::{AppConfig, Ingredient, IngredientStore, ManagerError, RecipeManager, Submission};
use serde_json::{json, Value as JsonValue};
use tempfile::TempDir;

fn fixture_prompts() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/prompts")
}

fn composer() -> PromptComposer {
    let tokenizer = BpeTokenizer::by_name("cl100k_base").unwrap();
    PromptComposer::new(TemplateLoader::new(fixture_prompts()), Arc::new(tokenizer))
}

fn fake_config(output_dir: &Path) -> AppConfig {
    let mut config = AppConfig::default().with_output_dir(output_dir);
    config.ai.fake = true;
    config.prompt_dir = fixture_prompts();
    config
}

/// Replays a fixed script of results, one per call.
struct ScriptedBackend {
    script: Mutex<VecDeque<Result<JsonValue, BackendError>>>,
    calls: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl ScriptedBackend {
    fn new(script: Vec<Result<JsonValue, BackendError>>) -> (Self, Arc<Mutex<Vec<CompletionRequest>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let backend = Self {
            script: Mutex::new(script.into()),
            calls: calls.clone(),
        };
        (backend, calls)
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<JsonValue, BackendError> {
        self.calls.lock().unwrap().push(request.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(BackendError::ParseError("script exhausted".to_string())))
    }

    fn backend_name(&self) -> &'static str {
        "scripted"
    }
}

#[test]
fn test_compose_fixture_template() {
    let messages = composer()
        .compose(
            &[
                Ingredient::new("egg", "2", "pcs"),
                Ingredient::new("spinach", "100", "g"),
            ],
            "vegetarian breakfast",
            true,
        )
        .unwrap();

    let roles: Vec<Role> = messages.iter().map(|m| m.role).collect();
    assert_eq!(
        roles,
        vec![Role::System, Role::System, Role::System, Role::User]
    );
    assert_eq!(
        messages[0].content,
        "You are a recipe generator. Answer in JSON."
    );

    let user = &messages[3].content;
    let json_start = user.find('[').unwrap();
    let block: JsonValue = serde_json::from_str(&user[json_start..]).unwrap();
    assert_eq!(block[0]["instruction"], "vegetarian breakfast");
    assert_eq!(block[0]["is_strict_ingredients"], true);
    assert_eq!(block[0]["ingredients"][0]["name"], "egg");
    assert_eq!(block[0]["ingredients"][1]["unit_of_measure"], "g");
}

#[test]
fn test_over_budget_prompt_is_rejected() {
    let composer = composer().with_budget(TokenBudget::new(2010, 2000));
    let err = composer
        .compose(&[Ingredient::new("egg", "2", "pcs")], "", true)
        .unwrap_err();
    assert!(matches!(err, ComposeError::PromptTooLong { limit: 10, .. }));
}

#[tokio::test]
async fn test_transient_failure_then_partial_recipes() {
    let temp_dir = TempDir::new().unwrap();
    let requests = AuditLog::new(temp_dir.path().join("requests.jsonl"));
    let responses = AuditLog::new(temp_dir.path().join("responses.jsonl"));

    let payload = json!({
        "choices": [
            {"message": {"content": "{\"recipe_name\": \"Spinach Omelette\", \"steps\": [\"Cook.\"]}"}},
            {"message": {"content": "not json at all"}}
        ]
    });
    let (backend, calls) = ScriptedBackend::new(vec![
        Err(BackendError::ApiError {
            status: 503,
            message: "overloaded".to_string(),
        }),
        Ok(payload.clone()),
    ]);

    let dispatcher = RequestDispatcher::new(
        Box::new(backend),
        &AiConfig::default(),
        requests.clone(),
        responses.clone(),
    )
    .with_retry_policy(RetryPolicy::new(3, Duration::from_millis(1)));

    let messages = composer()
        .compose(&[Ingredient::new("egg", "2", "pcs")], "", true)
        .unwrap();
    let response = dispatcher.dispatch(&messages).await.unwrap();

    assert_eq!(response.attempts, 2);
    assert_eq!(response.payload, payload);
    assert_eq!(calls.lock().unwrap().len(), 2);

    let recipes = extract_recipes(&response);
    assert_eq!(recipes.len(), 1);
    assert_eq!(recipes[0].recipe_name, "Spinach Omelette");

    // One request record per dispatch, not per attempt.
    let logged: Vec<LogEntry<RequestRecord>> = requests.entries().unwrap();
    assert_eq!(logged.len(), 1);
    assert_eq!(logged[0].record.request.messages, messages);
    let logged: Vec<LogEntry<ResponseRecord>> = responses.entries().unwrap();
    assert_eq!(logged.len(), 1);
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let temp_dir = TempDir::new().unwrap();
    let responses = AuditLog::new(temp_dir.path().join("responses.jsonl"));
    let (backend, calls) = ScriptedBackend::new(vec![Err(BackendError::ApiError {
        status: 400,
        message: "bad request".to_string(),
    })]);

    let dispatcher = RequestDispatcher::new(
        Box::new(backend),
        &AiConfig::default(),
        AuditLog::new(temp_dir.path().join("requests.jsonl")),
        responses.clone(),
    )
    .with_retry_policy(RetryPolicy::new(5, Duration::from_millis(1)));

    let messages = composer().compose(&[], "", false).unwrap();
    let err = dispatcher.dispatch(&messages).await.unwrap_err();

    assert!(matches!(
        err,
        DispatchError::Backend(BackendError::ApiError { status: 400, .. })
    ));
    assert_eq!(calls.lock().unwrap().len(), 1);
    assert!(!responses.path().exists());
}

#[tokio::test]
async fn test_fake_mode_is_byte_identical() {
    let temp_dir = TempDir::new().unwrap();
    let config = fake_config(temp_dir.path());
    let store = IngredientStore::new(config.items_path());
    store.add(Ingredient::new("egg", "4", "pcs")).unwrap();

    let manager = RecipeManager::from_config(&config).unwrap();
    let submission = Submission {
        generate_image: false,
        ..Submission::default()
    };

    let first = manager.submit(&submission).await.unwrap();
    let second = manager.submit(&submission).await.unwrap();

    assert_eq!(
        serde_json::to_string(&first.response).unwrap(),
        serde_json::to_string(&second.response).unwrap()
    );
    assert!(first.image.is_none());
    assert!(first.image_error.is_none());

    let responses = fs::read_to_string(temp_dir.path().join("responses.jsonl")).unwrap();
    assert_eq!(responses.lines().count(), 2);
    let requests = fs::read_to_string(temp_dir.path().join("requests.jsonl")).unwrap();
    assert_eq!(requests.lines().count(), 2);
}

#[tokio::test]
async fn test_full_submission_with_image() {
    let temp_dir = TempDir::new().unwrap();
    let config = fake_config(temp_dir.path());

    let manager = RecipeManager::from_config(&config).unwrap();
    manager
        .store()
        .add(Ingredient::new("egg", "4", "pcs"))
        .unwrap();
    manager
        .store()
        .add(Ingredient::new("butter", "1", "tbsp"))
        .unwrap();

    let outcome = manager.submit(&Submission::default()).await.unwrap();

    assert_eq!(outcome.recipes.len(), 1);
    assert_eq!(outcome.recipes[0].recipe_name, "Pantry Omelette");

    let image = outcome.image.expect("image should be generated");
    let path = image.path.expect("image should be downloaded");
    assert!(path.starts_with(temp_dir.path().join("images")));
    assert!(path.exists());

    let images = fs::read_to_string(temp_dir.path().join("images.jsonl")).unwrap();
    let record: JsonValue = serde_json::from_str(images.lines().next().unwrap()).unwrap();
    assert!(record["prompt"]
        .as_str()
        .unwrap()
        .starts_with("Photo of the dish:\n\nRecipe: Pantry Omelette"));
    assert!(record["recorded_at"].is_string());
}

#[tokio::test]
async fn test_template_without_role_tags_is_not_dispatched() {
    let temp_dir = TempDir::new().unwrap();
    let prompt_dir = temp_dir.path().join("prompts");
    fs::create_dir_all(&prompt_dir).unwrap();
    fs::write(prompt_dir.join("only.txt"), "Just text [ingredients_prompt]").unwrap();

    let mut config = fake_config(&temp_dir.path().join("data"));
    config.prompt_dir = prompt_dir;
    config.fragments = vec!["only".to_string()];

    let manager = RecipeManager::from_config(&config).unwrap();
    let err = manager.submit(&Submission::default()).await.unwrap_err();

    assert!(matches!(err, ManagerError::EmptyPrompt));
    assert!(!temp_dir.path().join("data/requests.jsonl").exists());
}

#[tokio::test]
async fn test_missing_fragment_aborts_submission_only() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = fake_config(temp_dir.path());
    config.fragments.push("prompt_missing".to_string());

    let manager = RecipeManager::from_config(&config).unwrap();
    manager
        .store()
        .add(Ingredient::new("rice", "1", "cup"))
        .unwrap();

    let err = manager.submit(&Submission::default()).await.unwrap_err();
    assert!(matches!(err, ManagerError::Compose(ComposeError::Template(_))));
    assert_eq!(manager.store().list().unwrap().len(), 1);
}

#[test]
fn test_image_prompt_from_fixture() {
    let recipe = larder_core::ai::parse_recipe(
        r#"{"recipe_name": "Fried Rice", "ingredients": [
            {"name": "rice", "quantity": "2", "unit_of_measure": "cups"},
            {"name": "egg", "quantity": "2", "unit_of_measure": "pcs"}
        ]}"#,
    )
    .unwrap();

    let prompt = ImagePromptComposer::new(TemplateLoader::new(fixture_prompts()))
        .compose(&recipe)
        .unwrap();

    assert_eq!(
        prompt,
        "Photo of the dish:\n\nRecipe: Fried Rice\nIngredients:\n- rice 2 cups\n- egg 2 pcs"
    );
}
