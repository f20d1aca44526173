pub mod lesson_generator;
pub mod lesson_orchestrator;
pub mod llm_provider;
pub mod mock_generator;
