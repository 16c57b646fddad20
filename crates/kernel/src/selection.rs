use vantage_common::ObjectId;

/// Receives the actor chosen by ray casting or pixel picking.
pub trait SelectionListener {
    fn select_actor(&mut self, actor: ObjectId);
}

/// Listener that remembers the last selection. Handy for headless use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LastSelection(pub Option<ObjectId>);

impl SelectionListener for LastSelection {
    fn select_actor(&mut self, actor: ObjectId) {
        self.0 = Some(actor);
    }
}

/// Selection indicator: the highlighted actor and its identifier label.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UuidBillboard {
    target: Option<ObjectId>,
    text: String,
}

impl UuidBillboard {
    pub fn set_target(&mut self, actor: ObjectId) {
        self.target = Some(actor);
        self.text = format!("UID: {actor}");
    }

    pub fn clear(&mut self) {
        self.target = None;
        self.text.clear();
    }

    pub fn target(&self) -> Option<ObjectId> {
        self.target
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}
