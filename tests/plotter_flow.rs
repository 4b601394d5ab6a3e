use std::time::Duration;

use plotarem::{
    actuator::sim::SimRig,
    bridge::{config::BridgeConfig, ConnectionState, NetworkBridge},
    command_server::{config::CommandServerConfig, CommandServer},
    dispatcher::{config::DispatcherConfig, CommandQueue, Plotter},
    drawing::{config::DrawingConfig, DrawingSequencer},
    geometry::Position,
    motion::config::MotionConfig,
    protocol::command::Command,
};
use tokio::{sync::mpsc, time::timeout};
use tokio_util::sync::CancellationToken;

fn plotter(rig: &SimRig, drawing: DrawingConfig) -> Plotter {
    Plotter::new(
        rig.coordinator(MotionConfig::default()).unwrap(),
        rig.pen(),
        DrawingSequencer::new(drawing),
        &DispatcherConfig::default(),
    )
}

#[tokio::test]
async fn test_operator_commands_reach_the_mechanism() {
    let rig = SimRig::new();
    let mut plotter = plotter(&rig, DrawingConfig::default());

    let (queue, commands) = CommandQueue::new(8);
    let mut server = CommandServer::new(
        CommandServerConfig {
            bind_address: "127.0.0.1:0".to_string(),
            ..Default::default()
        },
        queue,
    );
    server.start().await.unwrap();

    let cancel = CancellationToken::new();
    let control_cancel = cancel.clone();
    let control = tokio::spawn(async move {
        plotter.run(commands, control_cancel).await.unwrap();
        plotter
    });

    let (inbound, _inbound_rx) = mpsc::channel(8);
    let bridge = NetworkBridge::spawn(
        BridgeConfig {
            address: server.local_addr().unwrap().to_string(),
            reconnect_interval_ms: 50,
            ..Default::default()
        },
        inbound,
    );
    let mut state = bridge.subscribe();
    timeout(
        Duration::from_secs(5),
        state.wait_for(|s| *s == ConnectionState::Connected),
    )
    .await
    .unwrap()
    .unwrap();

    assert!(bridge.send("GOTO:2|2.5"));
    assert!(bridge.send("HELLO"));
    assert!(bridge.send_command(&Command::PenDown));

    // Commands run in order, so the pen only drops once the move is done.
    timeout(Duration::from_secs(30), async {
        while !rig.servo.history().await.contains(&0.0) {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap();

    cancel.cancel();
    let plotter = control.await.unwrap();
    let at = plotter.motion().position().await.unwrap();
    assert!(at.distance(&Position::new(2.0, 2.5)) < 0.05, "ended at {}", at);
    assert_eq!(rig.servo.history().await, vec![0.0, 100.0]);

    bridge.shutdown().await;
    server.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_draws_deployed_dxf_after_setup() {
    let deploy = tempfile::tempdir().unwrap();
    std::fs::write(
        deploy.path().join("square.dxf"),
        "0\nSECTION\n2\nENTITIES\n\
         0\nLWPOLYLINE\n90\n4\n70\n1\n10\n1\n20\n1\n10\n2\n20\n1\n10\n2\n20\n2\n10\n1\n20\n2\n\
         0\nENDSEC\n0\nEOF\n",
    )
    .unwrap();

    let rig = SimRig::new();
    let mut plotter = plotter(
        &rig,
        DrawingConfig {
            deploy_dir: deploy.path().to_path_buf(),
            ..Default::default()
        },
    );
    let cancel = CancellationToken::new();

    plotter.setup(&cancel).await.unwrap();
    plotter.draw_dxf_file("square.dxf", &cancel).await.unwrap();

    assert_eq!(
        rig.servo.history().await,
        vec![100.0, 100.0, 100.0, 0.0, 100.0]
    );
    let at = plotter.motion().position().await.unwrap();
    assert!(at.distance(&Position::ORIGIN) < 0.05, "ended at {}", at);
}
