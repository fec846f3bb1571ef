//! Premium speech providers reached over HTTP.
//!
//! Every provider takes one POST with the text and a voice id and answers with
//! audio, either raw bytes (ElevenLabs, the Amazon gateway) or base64 inside
//! JSON (Google). Status codes are mapped onto the shared error taxonomy.

use crate::config::VoxConfig;
use crate::error::{Result, VoxError};
use crate::media::{AudioBlob, AudioContainer};
use crate::speech::backend::{SpeechBackend, SpeechOutput, SpeechRequest, VoiceParams};
use crate::speech::clip::{ClipOutput, ElementFactory};
use crate::speech::conversion::{prepare_playable, AudioConverter};
use crate::speech::provider::{PremiumVoice, SpeechProvider};
use crate::speech::text::{TextOptions, TextProcessor};
use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};

/// Google answers with base64 audio inside JSON.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleResponse {
    audio_content: String,
}

#[derive(Debug, Clone, PartialEq)]
enum Auth {
    Header(&'static str, String),
    Bearer(String),
    /// Key travels in the query string
    Query,
}

/// A fully built provider request, before it touches the network.
#[derive(Debug, Clone, PartialEq)]
struct ApiRequest {
    url: String,
    auth: Auth,
    body: Value,
}

impl ApiRequest {
    /// Length of the text being synthesized, wherever the provider puts it.
    fn text_len(&self) -> usize {
        let input = &self.body["input"];
        [&self.body["text"], &input["text"], &input["ssml"]]
            .into_iter()
            .find_map(Value::as_str)
            .map_or(0, str::len)
    }
}

/// Backend for the premium providers.
pub struct RemoteBackend {
    provider: SpeechProvider,
    endpoint: Option<String>,
    api_key: Option<String>,
    client: reqwest::Client,
    text: TextProcessor,
    options: TextOptions,
    converter: Box<dyn AudioConverter>,
    elements: ElementFactory,
}

impl RemoteBackend {
    pub fn new(
        provider: SpeechProvider,
        endpoint: Option<String>,
        api_key: Option<String>,
        text: TextProcessor,
        options: TextOptions,
        converter: Box<dyn AudioConverter>,
        elements: ElementFactory,
    ) -> Self {
        Self {
            provider,
            endpoint,
            api_key,
            client: reqwest::Client::new(),
            text,
            options,
            converter,
            elements,
        }
    }

    /// Reads endpoint and key for `provider` from the configuration.
    pub fn from_config(
        provider: SpeechProvider,
        config: &VoxConfig,
        text: TextProcessor,
        options: TextOptions,
        converter: Box<dyn AudioConverter>,
        elements: ElementFactory,
    ) -> Self {
        let endpoint = config
            .endpoint(provider.id())
            .or_else(|| provider.default_endpoint().map(str::to_string));
        let api_key = config.api_key(provider.id());
        Self::new(provider, endpoint, api_key, text, options, converter, elements)
    }

    fn build_request(&self, api_key: &str, voice: &PremiumVoice, text: &str, params: VoiceParams) -> Result<ApiRequest> {
        let endpoint = self
            .endpoint
            .as_deref()
            .map(|e| e.trim_end_matches('/'))
            .filter(|e| !e.is_empty())
            .ok_or_else(|| VoxError::Provider {
                provider: self.provider.name().to_string(),
                reason: format!("no endpoint configured under [providers.{}]", self.provider.id()),
            })?;

        let request = match self.provider {
            SpeechProvider::ElevenLabs => {
                // ElevenLabs takes plain text only
                let plain = TextOptions {
                    ssml: false,
                    ..self.options
                };
                ApiRequest {
                    url: format!("{endpoint}/{}", voice.api_voice_id),
                    auth: Auth::Header("xi-api-key", api_key.to_string()),
                    body: json!({
                        "text": self.text.for_premium(text, plain),
                        "model_id": "eleven_multilingual_v2",
                        "voice_settings": {
                            "stability": 0.5,
                            "similarity_boost": 0.75,
                            "speed": params.rate,
                        },
                    }),
                }
            }
            SpeechProvider::Google => {
                let prepared = self.text.for_premium(text, self.options);
                let input = if crate::speech::text::is_ssml(&prepared) {
                    json!({ "ssml": prepared })
                } else {
                    json!({ "text": prepared })
                };
                ApiRequest {
                    url: format!("{endpoint}?key={}", urlencoding::encode(api_key)),
                    auth: Auth::Query,
                    body: json!({
                        "input": input,
                        "voice": { "languageCode": "en-US", "name": voice.api_voice_id },
                        "audioConfig": {
                            "audioEncoding": "MP3",
                            "speakingRate": params.rate,
                            "pitch": semitones(params.pitch),
                            "volumeGainDb": gain_db(params.volume),
                        },
                    }),
                }
            }
            SpeechProvider::Amazon => {
                let prepared = self.text.for_premium(text, self.options);
                let text_type = if crate::speech::text::is_ssml(&prepared) { "ssml" } else { "text" };
                ApiRequest {
                    url: endpoint.to_string(),
                    auth: Auth::Bearer(api_key.to_string()),
                    body: json!({
                        "text": prepared,
                        "voice_id": voice.api_voice_id,
                        "text_type": text_type,
                        "output_format": "mp3",
                    }),
                }
            }
            other => {
                return Err(VoxError::Unsupported {
                    reason: format!("{other} is not a remote provider"),
                })
            }
        };
        Ok(request)
    }

    async fn fetch_audio(&self, request: ApiRequest) -> Result<AudioBlob> {
        let name = self.provider.name();
        let url = request.url.split('?').next().unwrap_or_default();
        let text_len = request.text_len();
        tracing::debug!(
            "{} API Call:\n  URL: {}\n  Method: POST\n  Body: {} chars of text",
            name,
            url,
            text_len
        );

        let mut builder = self.client.post(&request.url).json(&request.body);
        builder = match &request.auth {
            Auth::Header(header, key) => builder.header(*header, key),
            Auth::Bearer(key) => builder.bearer_auth(key),
            Auth::Query => builder,
        };

        let response = builder.send().await.map_err(|e| network_error(self.provider, &e))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(status_error(self.provider, status.as_u16(), &body));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| network_error(self.provider, &e))?
            .to_vec();
        let audio = match self.provider {
            SpeechProvider::Google => decode_google(self.provider, &bytes)?,
            _ => bytes,
        };
        if audio.is_empty() {
            return Err(VoxError::Provider {
                provider: name.to_string(),
                reason: "response contained no audio".to_string(),
            });
        }

        let mime = AudioContainer::sniff(&audio).mime();
        tracing::debug!("{} API Response: {} bytes of {}", name, audio.len(), mime);
        Ok(AudioBlob::new(audio, mime))
    }
}

#[async_trait(?Send)]
impl SpeechBackend for RemoteBackend {
    fn provider(&self) -> SpeechProvider {
        self.provider
    }

    async fn start(&mut self, request: &SpeechRequest) -> Result<Box<dyn SpeechOutput>> {
        let api_key = self
            .api_key
            .clone()
            .ok_or_else(|| VoxError::MissingApiKey {
                provider: self.provider.name().to_string(),
            })?;
        let voice = PremiumVoice::resolve(self.provider, request.voice.as_deref()).ok_or_else(|| {
            VoxError::not_found(format!("{} voice", self.provider.name()))
        })?;

        let api_request = self.build_request(&api_key, voice, &request.text, request.params)?;
        let audio = self.fetch_audio(api_request).await?;
        let prepared = prepare_playable(&audio, self.converter.as_ref());
        tracing::info!("{} speaking with {} after {:?}", self.provider.name(), voice.name, prepared.attempts);

        let output = ClipOutput::start((self.elements)(), &prepared.clip, request.params.volume)?;
        Ok(Box::new(output))
    }
}

/// Pitch multiplier as Google's semitone offset.
fn semitones(pitch: f32) -> f32 {
    ((pitch - 1.0) * 20.0).clamp(-20.0, 20.0)
}

/// Linear volume as a dB gain within Google's accepted range.
fn gain_db(volume: f32) -> f32 {
    if volume <= 0.0 {
        -96.0
    } else {
        (20.0 * volume.log10()).clamp(-96.0, 16.0)
    }
}

fn status_error(provider: SpeechProvider, status: u16, body: &str) -> VoxError {
    let name = provider.name().to_string();
    match status {
        401 => VoxError::InvalidApiKey { provider: name },
        429 => VoxError::RateLimited { provider: name },
        500 | 502 | 503 | 504 => VoxError::Provider {
            provider: name,
            reason: "server is experiencing issues, please try again later".to_string(),
        },
        _ => VoxError::Provider {
            provider: name,
            reason: format!("status {status}: {}", body.trim()),
        },
    }
}

fn network_error(provider: SpeechProvider, e: &reqwest::Error) -> VoxError {
    let reason = if e.is_connect() {
        "failed to connect, check your internet connection".to_string()
    } else if e.is_timeout() {
        "request timed out".to_string()
    } else {
        format!("network error: {e}")
    };
    VoxError::Provider {
        provider: provider.name().to_string(),
        reason,
    }
}

fn decode_google(provider: SpeechProvider, body: &[u8]) -> Result<Vec<u8>> {
    let parsed: GoogleResponse = serde_json::from_slice(body).map_err(|e| VoxError::Provider {
        provider: provider.name().to_string(),
        reason: format!("unexpected response: {e}"),
    })?;
    base64::engine::general_purpose::STANDARD
        .decode(parsed.audio_content)
        .map_err(|e| VoxError::Provider {
            provider: provider.name().to_string(),
            reason: format!("invalid audio encoding: {e}"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::clip::tests::LoggingElement;
    use crate::speech::conversion::tests::FakeConverter;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    fn backend(provider: SpeechProvider, endpoint: Option<&str>, key: Option<&str>) -> RemoteBackend {
        let log = Rc::new(RefCell::new(Vec::new()));
        let events = Rc::new(RefCell::new(VecDeque::new()));
        RemoteBackend::new(
            provider,
            endpoint.map(str::to_string),
            key.map(str::to_string),
            TextProcessor::new().unwrap(),
            TextOptions::default(),
            Box::new(FakeConverter::default()),
            LoggingElement::factory(log, events),
        )
    }

    fn voice(id: &str) -> &'static PremiumVoice {
        PremiumVoice::find(id).unwrap()
    }

    #[test]
    fn elevenlabs_posts_plain_text_to_voice_path() {
        let b = backend(SpeechProvider::ElevenLabs, Some("https://api.elevenlabs.io/v1/text-to-speech/"), None);
        let request = b
            .build_request("k", voice("eleven_josh"), "Hi, you.", VoiceParams::default())
            .unwrap();
        assert_eq!(
            request.url,
            "https://api.elevenlabs.io/v1/text-to-speech/TxGEqnHWrfWFTfGW9XjX"
        );
        assert_eq!(request.auth, Auth::Header("xi-api-key", "k".into()));
        assert_eq!(request.body["text"], "Hi,  you. ");
    }

    #[test]
    fn google_sends_ssml_and_key_in_query() {
        let b = backend(SpeechProvider::Google, Some("https://tts.example/v1/text:synthesize"), None);
        let request = b
            .build_request("a b", voice("google_wavenet_m"), "Hello.", VoiceParams::new(1.0, 1.0, 1.0))
            .unwrap();
        assert_eq!(request.url, "https://tts.example/v1/text:synthesize?key=a%20b");
        assert_eq!(request.auth, Auth::Query);
        assert!(request.body["input"]["ssml"].as_str().unwrap().starts_with("<speak>"));
        assert_eq!(request.body["voice"]["name"], "en-US-Wavenet-D");
        assert_eq!(request.body["audioConfig"]["volumeGainDb"], 0.0);
    }

    #[test]
    fn logged_text_length_follows_provider_body() {
        let eleven = backend(SpeechProvider::ElevenLabs, Some("https://api.elevenlabs.io/v1/text-to-speech/"), None);
        let request = eleven
            .build_request("k", voice("eleven_josh"), "Hi", VoiceParams::default())
            .unwrap();
        assert_eq!(request.text_len(), request.body["text"].as_str().unwrap().len());

        let google = backend(SpeechProvider::Google, Some("https://tts.example/v1/text:synthesize"), None);
        let request = google
            .build_request("k", voice("google_wavenet_m"), "Hello.", VoiceParams::default())
            .unwrap();
        assert_eq!(request.text_len(), request.body["input"]["ssml"].as_str().unwrap().len());
        assert!(request.text_len() > 0);
    }

    #[test]
    fn amazon_requires_an_endpoint() {
        let b = backend(SpeechProvider::Amazon, None, Some("k"));
        let err = b
            .build_request("k", voice("amazon_joanna"), "Hi", VoiceParams::default())
            .unwrap_err();
        assert!(matches!(err, VoxError::Provider { .. }));

        let b = backend(SpeechProvider::Amazon, Some("https://gateway.example/speak"), Some("k"));
        let request = b
            .build_request("k", voice("amazon_joanna"), "Hi", VoiceParams::default())
            .unwrap();
        assert_eq!(request.auth, Auth::Bearer("k".into()));
        assert_eq!(request.body["voice_id"], "Joanna");
        assert_eq!(request.body["text_type"], "ssml");
    }

    #[test]
    fn statuses_map_onto_error_kinds() {
        let p = SpeechProvider::ElevenLabs;
        assert!(matches!(status_error(p, 401, ""), VoxError::InvalidApiKey { .. }));
        assert!(matches!(status_error(p, 429, ""), VoxError::RateLimited { .. }));
        match status_error(p, 400, " bad voice ") {
            VoxError::Provider { reason, .. } => assert_eq!(reason, "status 400: bad voice"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn google_audio_is_base64_decoded() {
        let body = br#"{"audioContent":"SUQzBA=="}"#;
        assert_eq!(decode_google(SpeechProvider::Google, body).unwrap(), b"ID3\x04");
        assert!(decode_google(SpeechProvider::Google, b"{}").is_err());
    }

    #[test]
    fn volume_maps_to_gain() {
        assert_eq!(gain_db(1.0), 0.0);
        assert_eq!(gain_db(0.0), -96.0);
        assert!((gain_db(0.5) + 6.02).abs() < 0.01);
        assert!((semitones(1.2) - 4.0).abs() < 1e-4);
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let mut b = backend(SpeechProvider::ElevenLabs, Some("http://127.0.0.1:9"), None);
        let err = b.start(&SpeechRequest::new("hi")).await.err().unwrap();
        assert!(matches!(err, VoxError::MissingApiKey { .. }));
        assert!(err.is_fatal_to_request());
    }
}
