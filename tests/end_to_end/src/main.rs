fn main() {
    println!("Run `cargo test -p end-to-end` to execute the end-to-end transfer tests.");
}

#[cfg(test)]
mod tests {
    use tokio_util::sync::CancellationToken;
    use url::Url;

    use piclink_data_channel::{ChannelError, MessageChannel, dial};
    use piclink_data_channel::PeerEndpoint;
    use piclink_docgen::{DocumentWriter, HtmlWriter, assemble};
    use piclink_ocr::{OcrEngine, OcrError, TextBlock, parse_blocks};
    use piclink_protocol::{ControlMessage, FileMessage, LaunchMode, share_url};
    use piclink_transfer::{
        OutgoingFile, ReceiveError, ReceiverConfig, ReceiverSession, ReceiverState, SenderConfig,
        SenderSession, SenderState,
    };

    fn photo(name: &str, bytes: &[u8]) -> OutgoingFile {
        OutgoingFile {
            name: name.into(),
            mime_type: "image/jpeg".into(),
            data: bytes.to_vec(),
        }
    }

    /// Full happy path: both session state machines over a real TCP
    /// connection, three files, byte-exact arrival in selection order.
    #[tokio::test]
    async fn batch_reaches_receiver_in_order() {
        let endpoint = PeerEndpoint::bind(0).await.unwrap();
        let id = endpoint.id().clone();
        let port = endpoint.port();
        let cancel = CancellationToken::new();

        let (receiver, rx_state, rx_progress) =
            ReceiverSession::new(ReceiverConfig::default(), cancel.clone());
        let receive = tokio::spawn(receiver.run(endpoint.accept(cancel.clone())));

        let (mut sender, tx_state, _) = SenderSession::connect(
            SenderConfig::default(),
            cancel.clone(),
            dial("127.0.0.1", port, &id, &cancel),
        )
        .await
        .unwrap();

        sender.select(photo("a.jpg", b"\xff\xd8first"));
        sender.select(photo("b.jpg", b"\xff\xd8second"));
        sender.select(photo("c.png", b"\x89PNGthird"));
        let sent = sender.send_batch().await.unwrap();
        assert_eq!(sent, 3);
        assert_eq!(*tx_state.borrow(), SenderState::Done);

        let files = receive.await.unwrap().unwrap();
        assert_eq!(*rx_state.borrow(), ReceiverState::Done);
        assert_eq!(rx_progress.borrow().received, 3);
        assert_eq!(rx_progress.borrow().announced_total, Some(3));

        let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.jpg", "b.jpg", "c.png"]);
        assert_eq!(files[0].data, b"\xff\xd8first");
        assert_eq!(files[0].mime_type, "image/jpeg");
        assert_eq!(files[2].data, b"\x89PNGthird");
        for (i, f) in files.iter().enumerate() {
            assert_eq!(f.index, i as u32);
            assert_eq!(f.total, 3);
        }
    }

    /// The scanned address round-trips into the dialing role with the same
    /// identifier the receiver published.
    #[tokio::test]
    async fn share_address_launches_the_sender_role() {
        let endpoint = PeerEndpoint::bind(0).await.unwrap();
        let base = Url::parse(&format!("http://localhost:{}/", endpoint.port())).unwrap();
        let share = share_url(&base, endpoint.id(), Some("192.0.2.7")).unwrap();

        match LaunchMode::from_url(share.as_str()).unwrap() {
            LaunchMode::Send { peer, host, port } => {
                assert_eq!(&peer, endpoint.id());
                assert_eq!(host, "192.0.2.7");
                assert_eq!(port, endpoint.port());
            }
            LaunchMode::Receive => panic!("share address must select the sender role"),
        }
    }

    /// A dialer that disappears mid-batch still yields the files that made
    /// it across when partial finalization is on.
    #[tokio::test]
    async fn partial_close_finalizes_what_arrived() {
        let endpoint = PeerEndpoint::bind(0).await.unwrap();
        let id = endpoint.id().clone();
        let port = endpoint.port();
        let cancel = CancellationToken::new();

        let (receiver, _, _) = ReceiverSession::new(ReceiverConfig::default(), cancel.clone());
        let receive = tokio::spawn(receiver.run(endpoint.accept(cancel.clone())));

        let mut channel = dial("127.0.0.1", port, &id, &cancel).await.unwrap();
        for index in 0..2u32 {
            channel
                .send(&ControlMessage::File(FileMessage {
                    name: format!("{index}.jpg"),
                    mime_type: "image/jpeg".into(),
                    data: vec![index as u8; 8],
                    index,
                    total: 3,
                }))
                .await
                .unwrap();
        }
        channel.close().await;
        drop(channel);

        let files = receive.await.unwrap().unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[1].name, "1.jpg");
    }

    /// Same interruption with strict finalization fails the session.
    #[tokio::test]
    async fn partial_close_errors_when_strict() {
        let endpoint = PeerEndpoint::bind(0).await.unwrap();
        let id = endpoint.id().clone();
        let port = endpoint.port();
        let cancel = CancellationToken::new();

        let (receiver, _, _) = ReceiverSession::new(
            ReceiverConfig {
                partial_on_close: false,
                ..ReceiverConfig::default()
            },
            cancel.clone(),
        );
        let receive = tokio::spawn(receiver.run(endpoint.accept(cancel.clone())));

        let mut channel = dial("127.0.0.1", port, &id, &cancel).await.unwrap();
        channel
            .send(&ControlMessage::File(FileMessage {
                name: "0.jpg".into(),
                mime_type: "image/jpeg".into(),
                data: vec![0; 8],
                index: 0,
                total: 2,
            }))
            .await
            .unwrap();
        channel.close().await;
        drop(channel);

        let err = receive.await.unwrap().unwrap_err();
        assert!(matches!(err, ReceiveError::ClosedPartial));
    }

    /// A second phone dialing during an active session is told busy and the
    /// first session is undisturbed.
    #[tokio::test]
    async fn second_dialer_cannot_disturb_the_session() {
        let endpoint = PeerEndpoint::bind(0).await.unwrap();
        let id = endpoint.id().clone();
        let port = endpoint.port();
        let cancel = CancellationToken::new();

        let (receiver, _, _) = ReceiverSession::new(ReceiverConfig::default(), cancel.clone());
        let receive = tokio::spawn(receiver.run(endpoint.accept(cancel.clone())));

        let mut first = dial("127.0.0.1", port, &id, &cancel).await.unwrap();
        first
            .send(&ControlMessage::File(FileMessage {
                name: "keep.jpg".into(),
                mime_type: "image/jpeg".into(),
                data: b"keep".to_vec(),
                index: 0,
                total: 1,
            }))
            .await
            .unwrap();

        let second = dial("127.0.0.1", port, &id, &cancel).await;
        assert!(matches!(second, Err(ChannelError::Busy)));

        first.send(&ControlMessage::Done).await.unwrap();
        let files = receive.await.unwrap().unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "keep.jpg");

        cancel.cancel();
    }

    /// OCR engine stub that replies the way a hosted model does, including
    /// one unparseable reply that must fall back to a raw block.
    struct CannedEngine;

    impl OcrEngine for CannedEngine {
        fn name(&self) -> &'static str {
            "canned"
        }

        async fn recognize(&self, image: &[u8], _mime: &str) -> Result<Vec<TextBlock>, OcrError> {
            let reply = match image {
                b"page-1" => "```json\n[{\"text\":\"Invoice\",\"alignment\":\"center\"}]\n```",
                b"page-2" => "the model rambled instead of returning JSON",
                _ => "[{\"text\":\"Total: 42\",\"alignment\":\"right\"}]",
            };
            Ok(parse_blocks(reply))
        }
    }

    /// Received images flow through recognition and assembly into one
    /// rendered document, degraded pages included.
    #[tokio::test]
    async fn recognized_batch_assembles_into_a_document() {
        let engine = CannedEngine;
        let images: Vec<Vec<u8>> =
            vec![b"page-1".to_vec(), b"page-2".to_vec(), b"page-3".to_vec()];

        let mut pages = Vec::new();
        for image in &images {
            pages.push(engine.recognize(image, "image/jpeg").await.unwrap());
        }

        let document = assemble(&pages);
        // 3 single-block pages plus 2 separators.
        assert_eq!(document.paragraphs.len(), 5);
        assert_eq!(document.paragraphs[0].text, "Invoice");
        assert_eq!(document.paragraphs[2].text, "the model rambled instead of returning JSON");

        let html = String::from_utf8(HtmlWriter.write(&document).unwrap()).unwrap();
        assert!(html.contains("text-align: center\">Invoice"));
        assert!(html.contains("text-align: right\">Total: 42"));
        assert!(html.contains("text-align: left\">the model rambled"));
    }
}
