//! End-to-end tests for the feature modules against a mock API.

use pollilib::{
    ChatOptions, ClientConfig, FunctionCalling, ImageGenerator, ImageRequest, MessageBuilder,
    ModelCatalog, PollinationsClient, SpeechSynthesizer, TextGenerator, TextRequest, TextStreamer,
    Transcriber, VisionAnalyzer, VisionRequest, Voice,
};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> PollinationsClient {
    let config = ClientConfig::default()
        .with_max_retries(0)
        .with_text_api(server.uri())
        .with_image_api(server.uri());
    PollinationsClient::new(config)
}

#[tokio::test]
async fn text_generation_sends_params_and_returns_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/What%20is%20the%20capital%20of%20France%3F"))
        .and(query_param("model", "openai"))
        .and(query_param("temperature", "0.3"))
        .and(query_param("seed", "7"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Paris."))
        .expect(1)
        .mount(&server)
        .await;

    let text = TextGenerator::new(client_for(&server));
    let request = TextRequest::new("What is the capital of France?")
        .with_temperature(0.3)
        .with_seed(7);
    assert_eq!(text.generate(&request).await.unwrap(), "Paris.");
}

#[tokio::test]
async fn chat_extracts_assistant_content_and_records_history() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/openai"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": "Hello there" } }],
            "usage": { "total_tokens": 12 }
        })))
        .mount(&server)
        .await;

    let mut text = TextGenerator::new(client_for(&server));
    let messages = vec![MessageBuilder::user("Hi")];
    let response = text
        .chat_in("conv-1", &messages, &ChatOptions::default())
        .await
        .unwrap();

    assert_eq!(response.content, "Hello there");
    assert_eq!(response.usage["total_tokens"], 12);
    assert!(response.safety.safe);

    let history = text.conversation("conv-1").unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1]["role"], "assistant");
    assert_eq!(history[1]["content"], "Hello there");
}

#[tokio::test]
async fn continued_conversation_never_duplicates_turns() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/openai"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": "Blue." } }]
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/openai"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": "Dark blue." } }]
        })))
        .mount(&server)
        .await;

    let mut text = TextGenerator::new(client_for(&server));
    let options = ChatOptions::default();
    text.continue_conversation("conv-1", "What color is the sky?", &options)
        .await
        .unwrap();
    text.continue_conversation("conv-1", "And at dusk?", &options)
        .await
        .unwrap();

    // Two turns: exactly user/assistant/user/assistant, no repeats.
    let history = text.conversation("conv-1").unwrap();
    let roles: Vec<&str> = history.iter().filter_map(|m| m["role"].as_str()).collect();
    assert_eq!(roles, vec!["user", "assistant", "user", "assistant"]);
    assert_eq!(history[2]["content"], "And at dusk?");
    assert_eq!(history[3]["content"], "Dark blue.");

    // The second request carried the prior turn exactly once.
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    let body: serde_json::Value = serde_json::from_slice(&requests[1].body).unwrap();
    let sent = body["messages"].as_array().unwrap();
    assert_eq!(sent.len(), 3);
    assert_eq!(sent[0]["content"], "What color is the sky?");
    assert_eq!(sent[1]["content"], "Blue.");
    assert_eq!(sent[2]["content"], "And at dusk?");
}

#[tokio::test]
async fn streaming_yields_delta_chunks_until_done() {
    let server = MockServer::start().await;

    let sse_body = concat!(
        ": keep-alive\n",
        "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hello \"}}]}\n",
        "\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"world\"}}]}\n",
        "data: [DONE]\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"ignored\"}}]}\n",
    );
    Mock::given(method("POST"))
        .and(path("/openai"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(sse_body.as_bytes().to_vec(), "text/event-stream"),
        )
        .mount(&server)
        .await;

    let streamer = TextStreamer::new(client_for(&server));
    let stream = streamer
        .stream_prompt("say hello", &ChatOptions::default())
        .await
        .unwrap();
    let summary = stream.collect().await.unwrap();

    assert_eq!(summary.response, "Hello world");
    assert_eq!(summary.chunks_received, 2);
    assert!(summary.duration > std::time::Duration::ZERO);
}

#[tokio::test]
async fn transcription_extracts_message_content() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/openai"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": "Hello from the recording." } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let transcriber = Transcriber::new(client_for(&server));
    let transcription = transcriber
        .transcribe(b"RIFF fake wav", "wav")
        .await
        .unwrap();

    assert_eq!(transcription.text, "Hello from the recording.");
    assert_eq!(transcription.format, "wav");

    // The request carried the audio as a base64 input_audio content part.
    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["model"], "openai-audio");
    let part = &body["messages"][0]["content"][1];
    assert_eq!(part["type"], "input_audio");
    assert_eq!(part["input_audio"]["format"], "wav");
    assert!(!part["input_audio"]["data"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn vision_analysis_sends_image_url_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/openai"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": "A tabby cat on a sofa." } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let analyzer = VisionAnalyzer::new(client_for(&server));
    let request = VisionRequest::default().with_prompt("Describe this image");
    let answer = analyzer
        .analyze_url("https://example.com/cat.png", &request)
        .await
        .unwrap();

    assert_eq!(answer, "A tabby cat on a sofa.");

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["model"], "openai");
    assert_eq!(body["max_tokens"], 500);
    let part = &body["messages"][0]["content"][1];
    assert_eq!(part["type"], "image_url");
    assert_eq!(part["image_url"]["url"], "https://example.com/cat.png");
}

#[tokio::test]
async fn image_generation_returns_bytes_and_format() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/prompt/a%20cat"))
        .and(query_param("model", "flux"))
        .and(query_param("width", "512"))
        .and(query_param("height", "512"))
        .and(query_param("nologo", "true"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(b"\x89PNG fake".to_vec(), "image/png"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let generator = ImageGenerator::new(client_for(&server));
    let request = ImageRequest::new("a cat").with_size(512, 512).with_nologo();
    let image = generator.generate(&request).await.unwrap();

    assert_eq!(&image.data[..], b"\x89PNG fake");
    assert_eq!(image.format.extension(), "png");
    assert_eq!(image.size_bytes(), 9);
}

#[tokio::test]
async fn model_catalog_normalizes_wrapped_names() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": ["flux", "kontext"]
        })))
        .mount(&server)
        .await;

    let catalog = ModelCatalog::new(client_for(&server));
    let models = catalog.image_models().await.unwrap();
    assert_eq!(models.len(), 2);
    assert_eq!(models[0].name, "flux");
    assert!(models[1].supports_img2img);
}

#[tokio::test]
async fn speech_generation_requests_the_audio_model() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/Hello%20world"))
        .and(query_param("model", "openai-audio"))
        .and(query_param("voice", "onyx"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"ID3 fake".to_vec(), "audio/mpeg"))
        .expect(1)
        .mount(&server)
        .await;

    let synth = SpeechSynthesizer::new(client_for(&server));
    let audio = synth.generate("Hello world", Voice::Onyx).await.unwrap();
    assert_eq!(audio.voice, Voice::Onyx);
    assert_eq!(&audio.data[..], b"ID3 fake");
}

#[tokio::test]
async fn function_calling_executes_tools_and_feeds_results_back() {
    let server = MockServer::start().await;

    // Round 1: the model asks for add(2, 3).
    Mock::given(method("POST"))
        .and(path("/openai"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": { "name": "add", "arguments": "{\"a\": 2, \"b\": 3}" }
                    }]
                }
            }]
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    // Round 2: plain answer.
    Mock::given(method("POST"))
        .and(path("/openai"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": "2 + 3 = 5" } }]
        })))
        .mount(&server)
        .await;

    let calling = FunctionCalling::new(client_for(&server));
    let messages = vec![MessageBuilder::user("what is 2 + 3?")];
    let result = calling.run(&messages, &ChatOptions::default()).await.unwrap();

    assert_eq!(result.content, "2 + 3 = 5");
    assert_eq!(result.rounds, 2);
    assert_eq!(result.tools_used, vec!["add"]);

    // The second request must carry the tool result message.
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    let body: serde_json::Value = serde_json::from_slice(&requests[1].body).unwrap();
    let tool_msg = body["messages"]
        .as_array()
        .unwrap()
        .iter()
        .find(|m| m["role"] == "tool")
        .expect("tool message present");
    assert_eq!(tool_msg["tool_call_id"], "call_1");
    assert_eq!(tool_msg["content"], "5.0");
    assert!(body.get("tools").is_some());
}
