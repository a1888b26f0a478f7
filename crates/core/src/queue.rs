//! プラットフォーム側スレッド → フレームループへのイベント受け渡し
//!
//! プラットフォームのコールバックは不変なイベントレコードを積むだけで、
//! 状態の変更はフレームループが1フレームに1回まとめて適用する。

use std::sync::mpsc::{self, Receiver, SyncSender, TryRecvError, TrySendError};

use crate::error::ImeError;
use crate::event::{ImeEvent, ImeEventKind};

/// 有界キューを作成する
pub fn event_queue(capacity: usize) -> (EventSender, EventQueue) {
    let (tx, rx) = mpsc::sync_channel(capacity.max(1));
    (EventSender { tx }, EventQueue { rx })
}

/// プロデューサ側。`send` はコールバックをブロックしないよう try_send。
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: SyncSender<ImeEvent>,
}

impl EventSender {
    pub fn send(&self, kind: ImeEventKind) -> Result<(), ImeError> {
        self.send_event(ImeEvent::now(kind))
    }

    /// キューが満杯ならイベントを破棄する。受信側が無い場合のみエラー。
    pub fn send_event(&self, event: ImeEvent) -> Result<(), ImeError> {
        match self.tx.try_send(event) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(event)) => {
                log::warn!("event queue full, dropped {:?}", event.kind);
                Ok(())
            }
            Err(TrySendError::Disconnected(_)) => Err(ImeError::Disconnected),
        }
    }

    /// 空きが出るまで待って送る。ウィンドウプロシージャからは呼ばないこと。
    ///
    /// 専用スレッドで動くプロデューサ（スクリプト再生など）が入力を取りこぼさないために使う。
    pub fn send_blocking(&self, kind: ImeEventKind) -> Result<(), ImeError> {
        self.tx
            .send(ImeEvent::now(kind))
            .map_err(|_| ImeError::Disconnected)
    }
}

/// 1回の drain の結果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Drained {
    pub applied: usize,
    pub quit: bool,
    /// 全プロデューサが終了済み
    pub disconnected: bool,
}

/// コンシューマ側（フレームループ）
#[derive(Debug)]
pub struct EventQueue {
    rx: Receiver<ImeEvent>,
}

impl EventQueue {
    /// 溜まっているイベントを順に `apply` へ渡す。`Quit` で止まる。
    pub fn drain_with<F>(&self, mut apply: F) -> Drained
    where
        F: FnMut(ImeEvent),
    {
        let mut drained = Drained::default();
        loop {
            match self.rx.try_recv() {
                Ok(event) => {
                    if event.kind == ImeEventKind::Quit {
                        drained.quit = true;
                        break;
                    }
                    apply(event);
                    drained.applied += 1;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    drained.disconnected = true;
                    break;
                }
            }
        }
        drained
    }
}
