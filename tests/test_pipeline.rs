mod common;

use common::*;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use wordlens::{
    DefinitionResult, OcrModels, OcrsRecognizer, OcrsWordDetector, PipelineError, WordPipeline,
};

#[tokio::test]
async fn test_two_words_end_to_end() -> anyhow::Result<()> {
    let server = dictionary_server(&[("tree", "A perennial woody plant.")]).await;
    let detector = FixedDetector::new(vec![detection(TREE_BOX), detection(ROCK_BOX)]);
    let pipeline = build_pipeline(detector.clone(), two_word_recognizer(), &server);

    let result = pipeline.run_bytes(&encode_png(&two_word_image())).await?;

    assert_eq!(result.words(), vec!["tree", "rock"]);
    assert!(result.entries[0].definition.is_found());
    assert_eq!(
        result.entries[0].definition.meanings()[0].definitions,
        vec!["A perennial woody plant."]
    );
    assert_eq!(result.entries[1].definition, DefinitionResult::NotFound);
    assert_eq!(detector.calls(), 1);

    Ok(())
}

#[tokio::test]
async fn test_no_boxes_gives_empty_result() -> anyhow::Result<()> {
    let server = dictionary_server(&[]).await;
    let pipeline = build_pipeline(FixedDetector::new(vec![]), two_word_recognizer(), &server);

    let result = pipeline.run(two_word_image()).await?;

    assert!(result.is_empty());
    assert!(server.received_requests().await.unwrap_or_default().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_undecodable_image_does_no_work() {
    let server = dictionary_server(&[]).await;
    let detector = FixedDetector::new(vec![detection(TREE_BOX)]);
    let recognizer = two_word_recognizer();
    let pipeline = build_pipeline(detector.clone(), recognizer.clone(), &server);

    let result = pipeline.run_bytes(b"definitely not an image").await;

    assert!(matches!(result, Err(PipelineError::Input(_))));
    assert_eq!(detector.calls(), 0);
    assert_eq!(recognizer.calls(), 0);
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn test_missing_file_is_input_error() {
    let server = dictionary_server(&[]).await;
    let pipeline = build_pipeline(FixedDetector::new(vec![]), two_word_recognizer(), &server);

    let result = pipeline.run_path(std::path::Path::new("/nonexistent/photo.png")).await;
    assert!(matches!(result, Err(PipelineError::Input(_))));
}

#[tokio::test]
async fn test_detector_failure_is_fatal() {
    let server = dictionary_server(&[]).await;
    let recognizer = two_word_recognizer();
    let pipeline = build_pipeline(Arc::new(FailingDetector), recognizer.clone(), &server);

    match pipeline.run(two_word_image()).await {
        Err(PipelineError::Detector(message)) => {
            assert!(message.contains("model weights corrupted"))
        }
        other => panic!("expected detector failure, got {other:?}"),
    }
    assert_eq!(recognizer.calls(), 0);
}

#[tokio::test]
async fn test_small_boxes_contribute_nothing() -> anyhow::Result<()> {
    let server = dictionary_server(&[("tree", "A woody plant.")]).await;
    // 2x2 box in the corner: 7x7 after margin and clipping
    let tiny = detection((0.0, 0.0, 2.0, 2.0));
    let recognizer = two_word_recognizer();
    let pipeline = build_pipeline(
        FixedDetector::new(vec![tiny, detection(TREE_BOX)]),
        recognizer.clone(),
        &server,
    );

    let result = pipeline.run(two_word_image()).await?;

    assert_eq!(result.words(), vec!["tree"]);
    // Three profiles for the one usable region only
    assert_eq!(recognizer.calls(), 3);

    Ok(())
}

#[tokio::test]
async fn test_repeated_word_listed_once() -> anyhow::Result<()> {
    let server = dictionary_server(&[]).await;
    let detector = FixedDetector::new(vec![
        detection(ROCK_BOX),
        detection(TREE_BOX),
        detection(ROCK_BOX),
    ]);
    let pipeline = build_pipeline(detector, two_word_recognizer(), &server);

    let result = pipeline.run(two_word_image()).await?;

    assert_eq!(result.words(), vec!["rock", "tree"]);
    assert_eq!(server.received_requests().await.unwrap_or_default().len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_unreadable_region_is_dropped() -> anyhow::Result<()> {
    let server = dictionary_server(&[]).await;
    // The tree region reads as digits only
    let recognizer = WidthRecognizer::new(vec![(140, "7733", 99.0), (180, "ROCK", 88.0)]);
    let pipeline = build_pipeline(
        FixedDetector::new(vec![detection(TREE_BOX), detection(ROCK_BOX)]),
        recognizer,
        &server,
    );

    let result = pipeline.run(two_word_image()).await?;
    assert_eq!(result.words(), vec!["rock"]);

    Ok(())
}

#[tokio::test]
async fn test_lookup_failure_is_isolated() -> anyhow::Result<()> {
    let server = dictionary_server(&[("cat", "A small domesticated carnivore.")]).await;
    Mock::given(method("GET"))
        .and(path("/entries/xyzzyqq"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .with_priority(1)
        .mount(&server)
        .await;

    let recognizer = WidthRecognizer::new(vec![(140, "cat", 90.0), (180, "xyzzyqq", 90.0)]);
    let pipeline = build_pipeline(
        FixedDetector::new(vec![detection(TREE_BOX), detection(ROCK_BOX)]),
        recognizer,
        &server,
    );

    let result = pipeline.run(two_word_image()).await?;

    assert_eq!(result.len(), 2);
    assert_eq!(result.words(), vec!["cat", "xyzzyqq"]);
    assert!(result.entries[0].definition.is_found());
    assert!(matches!(result.entries[1].definition, DefinitionResult::LookupError(_)));

    Ok(())
}

#[tokio::test]
async fn test_order_follows_detection_not_lookup_speed() -> anyhow::Result<()> {
    let server = dictionary_server(&[("rock", "A stone.")]).await;
    Mock::given(method("GET"))
        .and(path("/entries/tree"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(entry_json("tree", "A woody plant."))
                .set_delay(Duration::from_millis(300)),
        )
        .with_priority(1)
        .mount(&server)
        .await;

    let pipeline = build_pipeline(
        FixedDetector::new(vec![detection(TREE_BOX), detection(ROCK_BOX)]),
        two_word_recognizer(),
        &server,
    );

    let result = pipeline.run(two_word_image()).await?;

    assert_eq!(result.words(), vec!["tree", "rock"]);
    assert!(result.entries.iter().all(|e| e.definition.is_found()));

    Ok(())
}

#[tokio::test]
async fn test_result_serialization_shape() -> anyhow::Result<()> {
    let server = dictionary_server(&[("tree", "A woody plant.")]).await;
    let pipeline = build_pipeline(
        FixedDetector::new(vec![detection(TREE_BOX), detection(ROCK_BOX)]),
        two_word_recognizer(),
        &server,
    );

    let result = pipeline.run(two_word_image()).await?;
    let json = serde_json::to_value(&result)?;

    assert_eq!(json[0]["word"], "tree");
    assert_eq!(json[0]["definition_data"]["success"], true);
    assert_eq!(json[0]["definition_data"]["meanings"][0]["part_of_speech"], "noun");
    assert_eq!(json[1]["definition_data"]["success"], false);
    assert_eq!(json[1]["definition_data"]["error"], "Definition not found");

    Ok(())
}

#[tokio::test]
async fn test_debug_output_written_per_stage() -> anyhow::Result<()> {
    let server = dictionary_server(&[]).await;
    let debug_dir = tempfile::tempdir()?;
    let pipeline = build_pipeline(
        FixedDetector::new(vec![detection(TREE_BOX)]),
        two_word_recognizer(),
        &server,
    )
    .with_debug(debug_dir.path().to_path_buf())?;

    pipeline.run(two_word_image()).await?;

    assert!(debug_dir.path().join("00_input/01.png").exists());
    assert!(debug_dir.path().join("01_region/01.png").exists());
    assert!(debug_dir.path().join("02_grayscale_conversion/01.png").exists());
    assert!(debug_dir.path().join("07_dilate/01.png").exists());

    Ok(())
}

#[tokio::test]
async fn test_debug_dir_must_be_empty() -> anyhow::Result<()> {
    let server = dictionary_server(&[]).await;
    let debug_dir = tempfile::tempdir()?;
    std::fs::write(debug_dir.path().join("leftover.txt"), "old run")?;

    let result = build_pipeline(FixedDetector::new(vec![]), two_word_recognizer(), &server)
        .with_debug(debug_dir.path().to_path_buf());
    assert!(result.is_err());

    Ok(())
}

#[tokio::test]
async fn test_missing_ocr_models_stop_pipeline_setup() -> anyhow::Result<()> {
    let server = dictionary_server(&[]).await;
    let model_dir = tempfile::tempdir()?;
    let models = Arc::new(OcrModels::new(model_dir.path()));

    let result = WordPipeline::new(
        FixedDetector::new(vec![detection(TREE_BOX), detection(ROCK_BOX)]),
        Arc::new(OcrsRecognizer::new(models.clone())),
        &test_config(&server),
    );
    match result {
        Err(e) => assert!(e.to_string().contains("OCR models not found")),
        Ok(_) => panic!("pipeline built without OCR models"),
    }

    let result = WordPipeline::new(
        Arc::new(OcrsWordDetector::new(models)),
        two_word_recognizer(),
        &test_config(&server),
    );
    assert!(result.is_err());

    Ok(())
}
