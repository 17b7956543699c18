// Combat state machine

/// Frames spent lying on the ground after a knockdown
pub const KNOCKDOWN_FRAMES: u32 = 40;
/// Frames of the wake-up animation
pub const GETUP_FRAMES: u32 = 20;

/// What a fighter is currently doing, as far as combat is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CombatState {
    /// Neutral, free to act
    #[default]
    Idle,
    /// Performing an attack animation
    Attacking,
    /// Holding block
    Defending,
    /// Reeling from a hit
    HitStun,
    /// Recovering from a blocked hit
    BlockStun,
    /// On the ground after a knockdown
    KnockedDown,
    /// Standing back up
    GettingUp,
    /// Out of health
    KnockedOut,
}

impl CombatState {
    /// Check if the fighter is locked out by stun
    pub fn is_stunned(&self) -> bool {
        matches!(self, Self::HitStun | Self::BlockStun)
    }

    /// Check if the fighter can start an attack or block
    pub fn can_act(&self) -> bool {
        matches!(self, Self::Idle | Self::Defending)
    }

    /// Check if a hit landing now should be blocked
    pub fn is_blocking(&self) -> bool {
        matches!(self, Self::Defending | Self::BlockStun)
    }

    /// Animation state the animator should be in
    pub fn animation_state(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Attacking => "attack",
            Self::Defending | Self::BlockStun => "block",
            Self::HitStun => "hit",
            Self::KnockedDown => "knockdown",
            Self::GettingUp => "getup",
            Self::KnockedOut => "ko",
        }
    }
}

/// Frame-counted state machine driving a fighter's combat state
#[derive(Debug)]
pub struct CombatStateMachine {
    current_state: CombatState,
    previous_state: CombatState,
    frames_in_state: u32,
    stun_remaining: u32,
}

impl Default for CombatStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl CombatStateMachine {
    pub fn new() -> Self {
        Self {
            current_state: CombatState::Idle,
            previous_state: CombatState::Idle,
            frames_in_state: 0,
            stun_remaining: 0,
        }
    }

    pub fn state(&self) -> CombatState {
        self.current_state
    }

    pub fn previous_state(&self) -> CombatState {
        self.previous_state
    }

    /// Ticks spent in the current state
    pub fn frames_in_state(&self) -> u32 {
        self.frames_in_state
    }

    /// Stun frames left (hitstun or blockstun)
    pub fn stun_remaining(&self) -> u32 {
        self.stun_remaining
    }

    /// Check if state just changed this frame
    pub fn state_just_changed(&self) -> bool {
        self.frames_in_state == 0
    }

    /// Transition to a new state
    pub fn transition(&mut self, new_state: CombatState) {
        if self.current_state != new_state {
            self.force_transition(new_state);
        }
    }

    /// Transition even to the same state (resets the frame counter)
    pub fn force_transition(&mut self, new_state: CombatState) {
        self.previous_state = self.current_state;
        self.current_state = new_state;
        self.frames_in_state = 0;
    }

    /// Advance one tick. Returns the state left if a timed state expired.
    pub fn update(&mut self) -> Option<CombatState> {
        self.frames_in_state += 1;

        let expired = match self.current_state {
            CombatState::HitStun | CombatState::BlockStun => {
                self.stun_remaining = self.stun_remaining.saturating_sub(1);
                (self.stun_remaining == 0).then_some(CombatState::Idle)
            }
            CombatState::KnockedDown if self.frames_in_state >= KNOCKDOWN_FRAMES => {
                Some(CombatState::GettingUp)
            }
            CombatState::GettingUp if self.frames_in_state >= GETUP_FRAMES => {
                Some(CombatState::Idle)
            }
            _ => None,
        };

        expired.map(|next| {
            let left = self.current_state;
            self.transition(next);
            left
        })
    }

    /// Begin an attack if the fighter is free to act
    pub fn start_attack(&mut self) -> bool {
        if self.current_state.can_act() {
            self.force_transition(CombatState::Attacking);
            true
        } else {
            false
        }
    }

    /// Attack animation finished
    pub fn finish_attack(&mut self) {
        if self.current_state == CombatState::Attacking {
            self.transition(CombatState::Idle);
        }
    }

    /// Start or stop holding block
    pub fn set_defending(&mut self, defending: bool) {
        match (defending, self.current_state) {
            (true, CombatState::Idle) => self.transition(CombatState::Defending),
            (false, CombatState::Defending) => self.transition(CombatState::Idle),
            _ => {}
        }
    }

    /// Put the fighter in hitstun. A new hit restarts the count.
    pub fn apply_hit_stun(&mut self, frames: u32) {
        if self.current_state != CombatState::KnockedOut {
            self.force_transition(CombatState::HitStun);
            self.stun_remaining = frames.max(1);
        }
    }

    /// Put the fighter in blockstun
    pub fn apply_block_stun(&mut self, frames: u32) {
        if self.current_state != CombatState::KnockedOut {
            self.force_transition(CombatState::BlockStun);
            self.stun_remaining = frames.max(1);
        }
    }

    pub fn knock_down(&mut self) {
        if self.current_state != CombatState::KnockedOut {
            self.transition(CombatState::KnockedDown);
            self.stun_remaining = 0;
        }
    }

    pub fn knock_out(&mut self) {
        self.transition(CombatState::KnockedOut);
        self.stun_remaining = 0;
    }

    /// Back to neutral for a new round
    pub fn revive(&mut self) {
        self.force_transition(CombatState::Idle);
        self.stun_remaining = 0;
    }
}
