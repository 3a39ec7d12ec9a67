//! Integration tests for the mail library

use mail::templates::{allow_attachments, content_type, with_attachments};
use mail::{
    as_cc, ConfigurableRecorder, ConfigurableSender, Mail, MailError, MemRecorder, Recorder,
    RequestAttachment, Sender, Template, Transmitter, TxConfig,
};
use serde::Serialize;
use std::sync::Arc;

const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\x00\x00\x00\x0dIHDR";
const PDF: &[u8] = b"%PDF-1.4\n%\xe2\xe3\xcf\xd3\n";

#[derive(Serialize)]
struct Greeting {
    name: String,
    quote: String,
}

fn greeting() -> Greeting {
    Greeting {
        name: "The Frenchman".to_string(),
        quote: "Quelle fantastique bugette".to_string(),
    }
}

fn to(addresses: &[&str]) -> Vec<String> {
    addresses.iter().map(|a| a.to_string()).collect()
}

/// Calling code only knows about `Sender`
async fn send_greeting(sender: &dyn Sender, tpl: &Template) -> Result<Mail, MailError> {
    let message = tpl.execute(&greeting(), [])?;
    let recipients = to(&["ava@example.de"]);

    sender
        .send("test@example.de", &recipients, &message, &[])
        .await?;

    Ok(Mail::new("test@example.de", recipients, message))
}

mod recorder_tests {
    use super::*;

    #[tokio::test]
    async fn test_template_to_recorder_flow() {
        test_utils::init_tracing();
        let recorder = MemRecorder::new();
        let tpl = Template::new("{{name}} says hello!", "{{quote}}", []).unwrap();

        let mail = send_greeting(&recorder, &tpl).await.unwrap();

        assert!(recorder.seen(&mail).await.unwrap());
        assert_eq!(mail.message.topic, "The Frenchman says hello!");
    }

    #[tokio::test]
    async fn test_seen_after_different_second_mail() {
        let recorder = MemRecorder::new();
        let tpl = Template::new("{{name}} says hello!", "{{quote}}", []).unwrap();

        let first = send_greeting(&recorder, &tpl).await.unwrap();
        let other = Template::new("Goodbye", "{{quote}}", [])
            .unwrap()
            .execute(&greeting(), [])
            .unwrap();
        recorder
            .send("test@example.de", &to(&["ava@example.de"]), &other, &[])
            .await
            .unwrap();

        // Every recorded mail must match, so the first mail no longer counts as seen.
        assert!(!recorder.seen(&first).await.unwrap());
        assert_eq!(recorder.sent_count().await, 2);
    }

    #[tokio::test]
    async fn test_recorder_stores_config() {
        let recorder = MemRecorder::new();
        let cfg = TxConfig::new("test@example.de", "xxx", "smtp.example.de", 38145);

        recorder.update_tx_config(cfg.clone()).unwrap();

        assert_eq!(recorder.tx_config(), Some(cfg));
    }

    #[tokio::test]
    async fn test_attachments_reach_the_recorder() {
        let recorder = MemRecorder::new();
        let tpl = Template::new(
            "Report for {{name}}",
            "<p>{{quote}}</p>",
            [
                content_type("text/html"),
                allow_attachments(["image/png", "application/pdf"]),
            ],
        )
        .unwrap();

        let message = tpl
            .execute(
                &greeting(),
                [with_attachments(vec![
                    RequestAttachment::new("report", PDF),
                    RequestAttachment::new("logo", PNG),
                ])],
            )
            .unwrap();
        recorder
            .send("test@example.de", &to(&["ava@example.de", "bob@example.de"]), &message, &[as_cc()])
            .await
            .unwrap();

        let mails = recorder.mails().await;
        assert_eq!(mails.len(), 1);
        let kinds: Vec<_> = mails[0]
            .message
            .attachments
            .iter()
            .map(|a| a.kind.as_str())
            .collect();
        assert_eq!(kinds, ["application/pdf", "image/png"]);
        assert_eq!(mails[0].message.content_type, "text/html");
    }
}

mod template_tests {
    use super::*;

    #[tokio::test]
    async fn test_template_shared_across_tasks() {
        let tpl = Arc::new(
            Template::new(
                "{{name}}",
                "{{quote}}",
                [allow_attachments(["image/png", "application/pdf"])],
            )
            .unwrap(),
        );

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let tpl = Arc::clone(&tpl);
                tokio::spawn(async move {
                    let (name, content) = if i % 2 == 0 { ("logo", PNG) } else { ("doc", PDF) };
                    let message = tpl
                        .execute(&greeting(), [with_attachments(vec![RequestAttachment::new(name, content)])])
                        .unwrap();
                    (name, message)
                })
            })
            .collect();

        for handle in handles {
            let (name, message) = handle.await.unwrap();
            assert_eq!(message.attachments.len(), 1);
            assert_eq!(message.attachments[0].name, name);
        }
        assert!(tpl.attachments().is_empty());
    }

    #[test]
    fn test_request_attachments_from_json_payload() {
        let payload = serde_json::json!([
            { "name": "logo", "content": "iVBORw0KGgoAAAANSUhEUg==" }
        ]);
        let attachments: Vec<RequestAttachment> = serde_json::from_value(payload).unwrap();

        let tpl = Template::new("t", "b", [allow_attachments(["image/png"])]).unwrap();
        let message = tpl
            .execute(&serde_json::json!({}), [with_attachments(attachments)])
            .unwrap();

        assert_eq!(message.attachments[0].kind, "image/png");
    }
}

mod transmitter_tests {
    use super::*;
    use test_utils::TestMailpit;

    fn mailpit_config(mailpit: &TestMailpit) -> TxConfig {
        TxConfig::new(
            "test@example.de",
            "xxx",
            mailpit.smtp_host(),
            i64::from(mailpit.smtp_port()),
        )
    }

    #[tokio::test]
    async fn test_dial_rejects_invalid_port_without_network() {
        let cfg = TxConfig::new("test@example.de", "xxx", "smtp.example.de", 70000);

        let result = Transmitter::dial(cfg);

        assert!(matches!(result, Err(MailError::InvalidConfig(_))));
    }

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn test_send_through_mailpit() {
        test_utils::init_tracing();
        let mailpit = TestMailpit::new().await;
        let tmp = tempfile::tempdir().unwrap();
        let tx = Transmitter::dial(mailpit_config(&mailpit).with_tmp_dir(tmp.path().to_string_lossy()))
            .unwrap();
        let tpl = Template::new("{{name}} says hello!", "{{quote}}", []).unwrap();

        send_greeting(&tx, &tpl).await.unwrap();

        let messages = mailpit.wait_for_messages(1).await;
        assert_eq!(messages[0].subject, "The Frenchman says hello!");
        assert_eq!(messages[0].from.address, "test@example.de");
        assert_eq!(messages[0].to_addresses(), ["ava@example.de"]);
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn test_send_with_attachments_and_cc() {
        let mailpit = TestMailpit::new().await;
        let tx = Transmitter::dial(mailpit_config(&mailpit)).unwrap();
        let tpl = Template::new(
            "Logo",
            "See attachment",
            [
                allow_attachments(["image/png"]),
                with_attachments(vec![RequestAttachment::new("logo", PNG)]),
            ],
        )
        .unwrap();
        let message = tpl.execute(&serde_json::json!({}), []).unwrap();

        tx.send(
            "test@example.de",
            &to(&["ava@example.de", "bob@example.de"]),
            &message,
            &[as_cc()],
        )
        .await
        .unwrap();

        let messages = mailpit.wait_for_messages(1).await;
        assert_eq!(messages[0].attachments, 1);
        assert_eq!(messages[0].cc_addresses(), ["bob@example.de"]);
    }

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn test_extra_recipients_default_to_bcc() {
        let mailpit = TestMailpit::new().await;
        let tx = Transmitter::dial(mailpit_config(&mailpit)).unwrap();
        let tpl = Template::new("Hidden", "Body", []).unwrap();
        let message = tpl.execute(&serde_json::json!({}), []).unwrap();

        tx.send(
            "test@example.de",
            &to(&["ava@example.de", "bob@example.de"]),
            &message,
            &[],
        )
        .await
        .unwrap();

        let messages = mailpit.wait_for_messages(1).await;
        assert!(messages[0].cc_addresses().is_empty());
        assert_eq!(messages[0].to_addresses(), ["ava@example.de"]);
        assert_eq!(messages[0].bcc_addresses(), ["bob@example.de"]);
    }

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn test_reconfigure_between_sends() {
        let first = TestMailpit::new().await;
        let second = TestMailpit::new().await;
        let tx = Transmitter::dial(mailpit_config(&first)).unwrap();
        let tpl = Template::new("{{name}} says hello!", "{{quote}}", []).unwrap();

        send_greeting(&tx, &tpl).await.unwrap();
        tx.update_tx_config(mailpit_config(&second)).unwrap();
        send_greeting(&tx, &tpl).await.unwrap();

        assert_eq!(first.wait_for_messages(1).await.len(), 1);
        assert_eq!(second.wait_for_messages(1).await.len(), 1);
    }
}
