// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ob_core::test_support::descriptor;

#[tokio::test]
async fn delivers_in_order_then_closes() {
    let (tx, queue) = ChannelQueue::new();
    tx.send(descriptor("job-1")).unwrap();
    tx.send(descriptor("job-2")).unwrap();
    drop(tx);

    assert_eq!(queue.next().await.unwrap().unwrap().job_id, "job-1");
    assert_eq!(queue.next().await.unwrap().unwrap().job_id, "job-2");
    assert!(queue.next().await.unwrap().is_none());
}

#[tokio::test]
async fn ack_is_a_no_op() {
    let (_tx, queue) = ChannelQueue::new();
    queue.ack(&ob_core::JobId::new("job-1")).await.unwrap();
}
